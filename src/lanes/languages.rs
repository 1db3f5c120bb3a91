//! ISO 639 language names used for lane display names and validation.

/// (alpha-3 code, alpha-2 code, English name, native name)
const LANGUAGES: &[(&str, &str, &str, &str)] = &[
    ("ara", "ar", "Arabic", "العربية"),
    ("ben", "bn", "Bengali", "বাংলা"),
    ("chi", "zh", "Chinese", "Chinese"),
    ("cze", "cs", "Czech", "čeština"),
    ("dan", "da", "Danish", "dansk"),
    ("dut", "nl", "Dutch", "Nederlands"),
    ("eng", "en", "English", "English"),
    ("fin", "fi", "Finnish", "suomi"),
    ("fre", "fr", "French", "français"),
    ("ger", "de", "German", "Deutsch"),
    ("gre", "el", "Greek", "Ελληνικά"),
    ("heb", "he", "Hebrew", "עברית"),
    ("hin", "hi", "Hindi", "हिन्दी"),
    ("hun", "hu", "Hungarian", "magyar"),
    ("ita", "it", "Italian", "Italiano"),
    ("jpn", "ja", "Japanese", "日本語"),
    ("kor", "ko", "Korean", "한국어"),
    ("nor", "no", "Norwegian", "norsk"),
    ("per", "fa", "Persian", "فارسی"),
    ("pol", "pl", "Polish", "polski"),
    ("por", "pt", "Portuguese", "português"),
    ("rus", "ru", "Russian", "русский"),
    ("spa", "es", "Spanish", "español"),
    ("swe", "sv", "Swedish", "svenska"),
    ("tgl", "tl", "Tagalog", "Tagalog"),
    ("tur", "tr", "Turkish", "Türkçe"),
    ("ukr", "uk", "Ukrainian", "українська"),
    ("urd", "ur", "Urdu", "اردو"),
    ("vie", "vi", "Vietnamese", "Tiếng Việt"),
];

/// Terminology codes that have a separate bibliographic form.
const TERMINOLOGY_ALIASES: &[(&str, &str)] = &[
    ("zho", "chi"),
    ("ces", "cze"),
    ("nld", "dut"),
    ("fra", "fre"),
    ("deu", "ger"),
    ("ell", "gre"),
    ("fas", "per"),
];

fn entry(code: &str) -> Option<&'static (&'static str, &'static str, &'static str, &'static str)> {
    let code = code.trim().to_lowercase();
    let code = TERMINOLOGY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == code)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(code);
    LANGUAGES
        .iter()
        .find(|(alpha3, alpha2, _, _)| *alpha3 == code || *alpha2 == code)
}

/// Name of a language in that language. Unknown codes are returned as-is.
pub fn native_name(code: &str) -> String {
    entry(code)
        .map(|(_, _, _, native)| native.to_string())
        .unwrap_or_else(|| code.to_string())
}

pub fn english_name(code: &str) -> Option<&'static str> {
    entry(code).map(|(_, _, english, _)| *english)
}

/// Display name for a set of languages, e.g. `English/español/Chinese`.
pub fn name_for_languageset(languages: &[String]) -> String {
    languages
        .iter()
        .map(|code| native_name(code))
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve a language code or English name to its alpha-3 code.
pub fn string_to_alpha_3(value: &str) -> Option<&'static str> {
    if let Some((alpha3, _, _, _)) = entry(value) {
        return Some(alpha3);
    }
    let wanted = value.trim().to_lowercase();
    LANGUAGES
        .iter()
        .find(|(_, _, english, native)| english.to_lowercase() == wanted || native.to_lowercase() == wanted)
        .map(|(alpha3, _, _, _)| *alpha3)
}
