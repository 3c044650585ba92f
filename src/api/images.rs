use futures_util::future::{BoxFuture, FutureExt};

use super::{GateClient, ImageProvider, ImageQuery};
use crate::error::ApiError;
use crate::models::Image;

impl GateClient {
    /// Search images with the given query
    pub async fn find_images(&self, query: &ImageQuery) -> Result<Vec<Image>, ApiError> {
        self.get_json("/images/find", &query.to_pairs()).await
    }
}

impl ImageProvider for GateClient {
    fn find<'a>(&'a self, query: &'a ImageQuery) -> BoxFuture<'a, Result<Vec<Image>, ApiError>> {
        self.find_images(query).boxed()
    }
}
