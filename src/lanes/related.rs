//! "Related books" lanes derived from a single work.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::worklist::{ContributorLane, RecommendationLane, SeriesLane, WorkList, WorkScope};
use super::LaneError;
use crate::model::{IdentifierId, Work, WorkId};

/// Third-party source of "readers also liked" suggestions.
#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    async fn recommendations(&self, work: &Work) -> Result<Vec<IdentifierId>, LaneError>;
}

/// Invisible group lane holding everything related to one work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedBooksLane {
    work: WorkId,
    scope: WorkScope,
    children: Vec<WorkList>,
}

impl RelatedBooksLane {
    /// Build contributor, recommendation and series sublanes, in that order.
    ///
    /// Fails when the work has none of the three.
    pub fn new(work: &Work, recommendations: Vec<IdentifierId>) -> Result<Self, LaneError> {
        let scope = WorkScope::for_work(work);
        let mut lane = Self {
            work: work.id,
            scope: scope.clone(),
            children: Vec::new(),
        };

        for contributor in work.author_contributors() {
            match ContributorLane::new(Some(contributor.clone()), scope.clone()) {
                Ok(child) => lane.append_child(WorkList::Contributor(child)),
                Err(_) => debug!(contributor = %contributor.id, "Skipping contributor without a name"),
            }
        }

        if !recommendations.is_empty() {
            lane.append_child(WorkList::Recommendation(RecommendationLane::new(
                work,
                recommendations,
                scope.clone(),
            )));
        }

        if let Ok(series) = SeriesLane::new(work.series.as_deref(), scope) {
            lane.append_child(WorkList::Series(series));
        }

        if lane.children.is_empty() {
            return Err(LaneError::NoRelatedBooks(work.id));
        }
        Ok(lane)
    }

    pub fn work(&self) -> WorkId {
        self.work
    }

    pub fn scope(&self) -> &WorkScope {
        &self.scope
    }

    pub fn children(&self) -> &[WorkList] {
        &self.children
    }

    /// Add a sublane, giving it this lane's languages and audiences.
    pub fn append_child(&mut self, mut child: WorkList) {
        if let Some(scope) = child.scope_mut() {
            *scope = self.scope.clone();
        }
        self.children.push(child);
    }
}

/// Related books for `work`, asking `provider` for recommendations if given.
///
/// A failing provider is logged and treated as having no suggestions.
pub async fn related_books(
    work: &Work,
    provider: Option<&dyn RecommendationProvider>,
) -> Result<RelatedBooksLane, LaneError> {
    let recommendations = match provider {
        Some(provider) => match provider.recommendations(work).await {
            Ok(found) => found,
            Err(e) => {
                warn!(work = %work.id, error = %e, "Recommendation lookup failed");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    RelatedBooksLane::new(work, recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Audience, Contribution, Contributor, ContributorId};

    struct FixedRecommendations(Vec<IdentifierId>);

    #[async_trait]
    impl RecommendationProvider for FixedRecommendations {
        async fn recommendations(&self, _work: &Work) -> Result<Vec<IdentifierId>, LaneError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenRecommendations;

    #[async_trait]
    impl RecommendationProvider for BrokenRecommendations {
        async fn recommendations(&self, _work: &Work) -> Result<Vec<IdentifierId>, LaneError> {
            Err(LaneError::Recommendations("service unavailable".to_string()))
        }
    }

    fn work() -> Work {
        let mut work = Work::new(WorkId(1), IdentifierId(1), "Quite British");
        work.language = Some("eng".to_string());
        work.audience = Some(Audience::YoungAdult);
        work
    }

    fn contribution(id: u64, name: &str, role: &str) -> Contribution {
        Contribution {
            contributor: Contributor {
                id: ContributorId(id),
                sort_name: None,
                display_name: Some(name.to_string()),
            },
            role: role.to_string(),
        }
    }

    fn kinds(lane: &RelatedBooksLane) -> Vec<&'static str> {
        lane.children()
            .iter()
            .map(|c| match c {
                WorkList::Contributor(_) => "contributor",
                WorkList::Recommendation(_) => "recommendation",
                WorkList::Series(_) => "series",
                _ => "other",
            })
            .collect()
    }

    #[test]
    fn test_nothing_related_is_an_error() {
        let result = RelatedBooksLane::new(&work(), Vec::new());
        assert!(matches!(result, Err(LaneError::NoRelatedBooks(WorkId(1)))));
    }

    #[test]
    fn test_children_order_and_scope() {
        let mut work = work();
        work.series = Some("All By Myself".to_string());
        work.contributions.push(contribution(1, "John Bull", "Primary Author"));
        work.contributions.push(contribution(2, "Ed Itor", "Editor"));

        let lane = RelatedBooksLane::new(&work, vec![IdentifierId(7)]).unwrap();
        assert_eq!(kinds(&lane), vec!["contributor", "recommendation", "series"]);

        let related = WorkList::RelatedBooks(lane.clone());
        assert!(!related.visible());
        assert_eq!(related.display_name(), "Related Books");

        for child in lane.children() {
            let restrictions = child.restrictions();
            assert_eq!(restrictions.languages, vec!["eng".to_string()]);
            assert_eq!(restrictions.audiences, Audience::juvenile());
        }
    }

    #[test]
    fn test_editor_used_without_author() {
        let mut work = work();
        work.contributions.push(contribution(2, "Ed Itor", "Editor"));

        let lane = RelatedBooksLane::new(&work, Vec::new()).unwrap();
        assert_eq!(lane.children().len(), 1);
        assert_eq!(lane.children()[0].display_name(), "Ed Itor");
    }

    #[test]
    fn test_append_child_takes_parent_scope() {
        let mut work = work();
        work.series = Some("Series".to_string());
        let mut lane = RelatedBooksLane::new(&work, Vec::new()).unwrap();

        let outsider = SeriesLane::new(
            Some("Other"),
            WorkScope::new(vec!["fre".to_string()], Audience::adult()),
        )
        .unwrap();
        lane.append_child(WorkList::Series(outsider));

        let restrictions = lane.children()[1].restrictions();
        assert_eq!(restrictions.languages, vec!["eng".to_string()]);
        assert_eq!(restrictions.audiences, Audience::juvenile());
    }

    #[tokio::test]
    async fn test_related_books_with_provider() {
        let provider = FixedRecommendations(vec![IdentifierId(3), IdentifierId(4)]);
        let lane = related_books(&work(), Some(&provider)).await.unwrap();
        assert_eq!(kinds(&lane), vec!["recommendation"]);
        assert_eq!(lane.children()[0].display_name(), "Recommendations for Quite British");
    }

    #[tokio::test]
    async fn test_related_books_provider_failure() {
        let result = related_books(&work(), Some(&BrokenRecommendations)).await;
        assert!(matches!(result, Err(LaneError::NoRelatedBooks(_))));

        let empty = FixedRecommendations(Vec::new());
        assert!(related_books(&work(), Some(&empty)).await.is_err());
    }
}
