//! Provider image push
//!
//! 1. Validate: find the locally built images for this selection
//! 2. Push: one future per image, all joined; the batch fails if any
//!    push fails, but every push runs to completion
//!
//! Only the last image's progress stream is rendered. The others are
//! drained so their uploads finish.

use futures::future::join_all;
use futures::stream::BoxStream;
use std::io::Write;
use tracing::{debug, info, warn};

use crate::error::{CanvosError, Result};
use crate::selection::SelectionSet;

mod engine;
mod progress;

pub use engine::{
    endpoint_from_docker_host, split_image_reference, DockerEngine, ImageEngine, RegistryAuth,
    DEFAULT_DOCKER_ENDPOINT,
};
pub use progress::{decode_progress, drain_progress, progress_error, render_progress_line};

/// Raw progress output of one push
pub type ProgressStream = BoxStream<'static, Result<Vec<u8>>>;

/// Whether a `repository:tag` belongs to this build.
///
/// The repository must contain `<registry>/<repository>` and the tag
/// must contain the custom tag.
pub fn matches_selection(repo_tag: &str, selection: &SelectionSet) -> bool {
    let (repository, tag) = split_image_reference(repo_tag);
    if repository == repo_tag {
        return false;
    }

    repository.contains(&selection.registry.image_prefix()) && tag.contains(&selection.custom_tag)
}

/// Local images built for `selection`, in engine order
pub async fn validate_images<E>(engine: &E, selection: &SelectionSet) -> Result<Vec<String>>
where
    E: ImageEngine + ?Sized,
{
    let images: Vec<String> = engine
        .list_repo_tags()
        .await?
        .into_iter()
        .filter(|repo_tag| matches_selection(repo_tag, selection))
        .collect();

    if images.is_empty() {
        return Err(CanvosError::NoImagesFound {
            filter: format!(
                "{}:*{}*",
                selection.registry.image_prefix(),
                selection.custom_tag
            ),
        });
    }

    debug!("Found {} provider images", images.len());
    Ok(images)
}

async fn push_one<E>(engine: &E, image: &str, encoded_auth: &str) -> Result<ProgressStream>
where
    E: ImageEngine + ?Sized,
{
    engine
        .push(image, encoded_auth)
        .await
        .map_err(|e| match e {
            CanvosError::PushFailed { .. } => e,
            other => CanvosError::PushFailed {
                image: image.to_string(),
                message: other.to_string(),
            },
        })
}

/// Validate and push every provider image for `selection`.
///
/// Returns the pushed image names. Progress of the last image is
/// rendered to `sink`.
pub async fn push_artifacts<E, W>(
    engine: &E,
    encoded_auth: &str,
    selection: &SelectionSet,
    sink: &mut W,
) -> Result<Vec<String>>
where
    E: ImageEngine + ?Sized,
    W: Write + Send + ?Sized,
{
    let images = validate_images(engine, selection).await?;
    let Some((last, rest)) = images.split_last() else {
        return Ok(images);
    };

    info!("Pushing {} images to {}", images.len(), selection.registry.image_prefix());

    let background = join_all(rest.iter().map(|image| async move {
        let result = match push_one(engine, image, encoded_auth).await {
            Ok(stream) => drain_progress(image, stream).await,
            Err(e) => Err(e),
        };
        (image.clone(), result)
    }));

    let rendered = async {
        let result = match push_one(engine, last, encoded_auth).await {
            Ok(stream) => decode_progress(last, stream, sink).await,
            Err(e) => Err(e),
        };
        (last.clone(), result)
    };

    let (mut results, last_result) = futures::join!(background, rendered);
    results.push(last_result);

    let total = results.len();
    let mut failures = Vec::new();
    for (image, result) in results {
        match result {
            Ok(()) => debug!("Pushed {}", image),
            Err(e) => {
                warn!("Push of {} failed: {}", image, e);
                failures.push(e);
            }
        }
    }

    let failed = failures.len();
    if let Some(first) = failures.into_iter().next() {
        return Err(CanvosError::BatchFailed {
            failed,
            total,
            first: Box::new(first),
        });
    }

    info!("Pushed {} images", total);
    Ok(images)
}
