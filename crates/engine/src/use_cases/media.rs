//! Media resolution for narrative steps.
//!
//! Turns a step's resource reference into the [`StepMedia`] the play session
//! gates on. Content problems (a missing row, an unknown kind, malformed
//! hotspot or app metadata) leave the step ungated and are only logged; a
//! backend that cannot be reached is an error.

use std::sync::Arc;

use resistencia_domain::{MediaResource, NarrativeStep, ResourceId, StepMedia};

use crate::infrastructure::ports::{MediaRepo, RepoError};

pub struct ResolveMedia {
    media: Arc<dyn MediaRepo>,
}

impl ResolveMedia {
    pub fn new(media: Arc<dyn MediaRepo>) -> Self {
        Self { media }
    }

    /// Looks up one resource row.
    pub async fn get_resource(&self, id: ResourceId) -> Result<Option<MediaResource>, RepoError> {
        self.media.get(id).await
    }

    pub async fn for_step(&self, step: &NarrativeStep) -> Result<StepMedia, RepoError> {
        let Some(resource_id) = step.resource else {
            return Ok(StepMedia::none());
        };

        let resource = match self.get_resource(resource_id).await {
            Ok(Some(resource)) => resource,
            Ok(None) => {
                tracing::warn!(
                    step_id = %step.id,
                    resource_id = %resource_id,
                    "Step media not found, step left ungated"
                );
                return Ok(StepMedia::none());
            }
            Err(e @ (RepoError::NotFound { .. } | RepoError::Serialization(_))) => {
                tracing::warn!(
                    step_id = %step.id,
                    resource_id = %resource_id,
                    error = %e,
                    "Unreadable step media, step left ungated"
                );
                return Ok(StepMedia::none());
            }
            Err(e) => return Err(e),
        };

        let kind = resource.kind;
        let (media, degraded) = StepMedia::resolve(Some(resource), step.kind);
        if let Some(error) = degraded {
            tracing::warn!(
                step_id = %step.id,
                resource_id = %resource_id,
                media_kind = %kind,
                error = %error,
                "Malformed media metadata, using defaults"
            );
        }
        Ok(media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockMediaRepo;
    use mockall::predicate::eq;
    use resistencia_domain::{MediaKind, StepId, StepKind, StoryId};

    fn step_with_resource(id: i64) -> NarrativeStep {
        NarrativeStep::new(StepId::new(1), StoryId::new(1), 0, StepKind::Narrative)
            .with_resource(ResourceId::new(id))
    }

    #[tokio::test]
    async fn step_without_resource_needs_no_lookup() {
        let repo = MockMediaRepo::new();
        let resolve = ResolveMedia::new(Arc::new(repo));

        let step = NarrativeStep::new(StepId::new(1), StoryId::new(1), 0, StepKind::Narrative);
        let media = resolve.for_step(&step).await.unwrap();
        assert!(media.resource().is_none());
    }

    #[tokio::test]
    async fn model_resource_builds_a_scene() {
        let mut repo = MockMediaRepo::new();
        repo.expect_get()
            .with(eq(ResourceId::new(7)))
            .returning(|id| {
                Ok(Some(
                    MediaResource::new(id, MediaKind::Model3d, "casa.glb").with_metadata(
                        r#"[{"meshName":"Puerta","contentType":"image","url":"p.jpg"}]"#,
                    ),
                ))
            });
        let resolve = ResolveMedia::new(Arc::new(repo));

        let media = resolve.for_step(&step_with_resource(7)).await.unwrap();
        assert_eq!(media.scene().map(|s| s.total_regions()), Some(1));
    }

    #[tokio::test]
    async fn missing_row_leaves_step_ungated() {
        let mut repo = MockMediaRepo::new();
        repo.expect_get().returning(|_| Ok(None));
        let resolve = ResolveMedia::new(Arc::new(repo));

        let media = resolve.for_step(&step_with_resource(3)).await.unwrap();
        assert!(media.resource().is_none());
        assert!(media.scene().is_none());
    }

    #[tokio::test]
    async fn unreadable_row_leaves_step_ungated() {
        let mut repo = MockMediaRepo::new();
        repo.expect_get()
            .returning(|_| Err(RepoError::serialization("unknown media kind")));
        let resolve = ResolveMedia::new(Arc::new(repo));

        let media = resolve.for_step(&step_with_resource(3)).await.unwrap();
        assert!(media.resource().is_none());
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_error() {
        let mut repo = MockMediaRepo::new();
        repo.expect_get()
            .returning(|_| Err(RepoError::http("connection refused")));
        let resolve = ResolveMedia::new(Arc::new(repo));

        let result = resolve.for_step(&step_with_resource(3)).await;
        assert!(matches!(result, Err(RepoError::Http(_))));
    }
}
