mod derive;
mod model;

pub use derive::{
    derive_page, derive_record, sort_derived, sum_page, sum_selected, Classifier, DerivedRecord,
    PageSums,
};
pub use model::{EntityKind, LedgerRecord, Payment, PaymentCategory, RecordId, AMOUNT_EPSILON};
pub(crate) use model::wire;
