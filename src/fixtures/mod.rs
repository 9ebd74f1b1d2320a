//! Mutation payloads and the component tree they feed.

pub mod components;

pub use components::{define_components, XApp, XItem, XThing, X_APP, X_ITEM, X_THING};

use std::rc::Rc;

/// Fields carried by every record.
pub const FIELD_COUNT: usize = 99;

/// A flat record of string fields, addressed by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: [String; FIELD_COUNT],
}

impl Record {
    /// Builds a record whose field `i` reads `"{prefix}: {i}"`.
    pub fn new(prefix: usize) -> Self {
        Self {
            fields: std::array::from_fn(|i| format!("{prefix}: {i}")),
        }
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

/// Shared, immutable list of records. Identity matters: assigning the same
/// dataset twice is not a change.
pub type Dataset = Rc<[Rc<Record>]>;

pub fn generate_data(count: usize) -> Vec<Rc<Record>> {
    (0..count).map(|i| Rc::new(Record::new(i))).collect()
}

/// The two interchangeable payloads swapped into the list during updates.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub data: Dataset,
    pub other_data: Dataset,
}

impl Datasets {
    /// `data` holds records `0..len`; `other_data` holds records `len..2*len`
    /// of a double-length generation, so the two never share a prefix.
    ///
    /// Panics if `2 * len` overflows; `BenchmarkDriver::new` rejects such
    /// lengths up front.
    pub fn generate(len: usize) -> Self {
        let data: Dataset = generate_data(len).into();
        let other_data: Dataset = generate_data(len * 2).split_off(len).into();
        Self { data, other_data }
    }

    /// Payload for update iteration `i`: `data` on even turns, `other_data`
    /// on odd ones.
    pub fn for_iteration(&self, i: usize) -> &Dataset {
        if i % 2 == 1 {
            &self.other_data
        } else {
            &self.data
        }
    }
}
