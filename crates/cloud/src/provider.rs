//! The imagery provider contract.

use crate::collection::ImageryRequest;
use crate::composite::Composite;
use crate::error::Result;

/// Source of composited imagery for a region and time window.
///
/// Implementations filter scenes with the request's [`SceneFilter`],
/// composite the survivors per pixel and return every requested band on one
/// grid. No matching scene is [`CloudError::NoImagery`].
///
/// [`SceneFilter`]: crate::collection::SceneFilter
/// [`CloudError::NoImagery`]: crate::error::CloudError::NoImagery
pub trait ImageryProvider {
    /// Provider name for logs and reports
    fn name(&self) -> &str;

    fn composite(&self, request: &ImageryRequest) -> Result<Composite>;
}

impl<P: ImageryProvider + ?Sized> ImageryProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn composite(&self, request: &ImageryRequest) -> Result<Composite> {
        (**self).composite(request)
    }
}
