//! Input-driven response arity for batch endpoints.
//!
//! The docs endpoint answers a single object with a single outcome record and
//! an array with an array of records in submission order. Which one comes
//! back is decided by the type of what was submitted, never by looking at
//! the response.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ValidationError;
use crate::models::{DeindexedResult, Document, DocumentIdentifier, IndexedResult};

/// An item the docs endpoint accepts, paired with its per-item outcome record
pub trait Submittable: Serialize + Sync {
    type Outcome: DeserializeOwned + Send;

    fn validate(&self) -> Result<(), ValidationError>;
}

impl Submittable for Document {
    type Outcome = IndexedResult;

    fn validate(&self) -> Result<(), ValidationError> {
        Document::validate(self)
    }
}

impl Submittable for DocumentIdentifier {
    type Outcome = DeindexedResult;

    fn validate(&self) -> Result<(), ValidationError> {
        DocumentIdentifier::validate(self)
    }
}

/// A request body for the docs endpoint: one item or an ordered batch
pub trait Submission: Serialize + Sync {
    type Item: Submittable;
    type Output: DeserializeOwned + Send;

    /// Submitted item count, `None` for a single item
    fn batch_len(&self) -> Option<usize>;

    /// Record count of a decoded response, `None` for a single record
    fn output_len(output: &Self::Output) -> Option<usize>;

    fn items(&self) -> &[Self::Item];
}

macro_rules! submission {
    ($item:ty) => {
        impl Submission for $item {
            type Item = $item;
            type Output = <$item as Submittable>::Outcome;

            fn batch_len(&self) -> Option<usize> {
                None
            }

            fn output_len(_output: &Self::Output) -> Option<usize> {
                None
            }

            fn items(&self) -> &[$item] {
                std::slice::from_ref(self)
            }
        }

        impl Submission for [$item] {
            type Item = $item;
            type Output = Vec<<$item as Submittable>::Outcome>;

            fn batch_len(&self) -> Option<usize> {
                Some(self.len())
            }

            fn output_len(output: &Self::Output) -> Option<usize> {
                Some(output.len())
            }

            fn items(&self) -> &[$item] {
                self
            }
        }

        impl Submission for Vec<$item> {
            type Item = $item;
            type Output = Vec<<$item as Submittable>::Outcome>;

            fn batch_len(&self) -> Option<usize> {
                Some(self.len())
            }

            fn output_len(output: &Self::Output) -> Option<usize> {
                Some(output.len())
            }

            fn items(&self) -> &[$item] {
                self
            }
        }
    };
}

submission!(Document);
submission!(DocumentIdentifier);
