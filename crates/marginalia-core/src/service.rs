//! The annotation service the controller talks to.

use std::future::Future;

use crate::error::ServiceError;
use crate::types::{Annotation, AnnotationId, CreatedAnnotation, DocumentId, NewAnnotation};

/// Remote store of annotations.
///
/// Futures are not required to be `Send`; everything runs on one
/// cooperative executor.
pub trait AnnotationService {
    /// Every annotation of a document, possibly with duplicate ids.
    fn list(
        &self,
        document: &DocumentId,
    ) -> impl Future<Output = Result<Vec<Annotation>, ServiceError>>;

    /// Store a new annotation and return its server-assigned id.
    fn create(
        &self,
        document: &DocumentId,
        annotation: &NewAnnotation,
    ) -> impl Future<Output = Result<CreatedAnnotation, ServiceError>>;

    fn delete(&self, id: &AnnotationId) -> impl Future<Output = Result<(), ServiceError>>;
}
