pub mod catalog;
pub mod grade;
pub mod review_data;
pub mod review_session;
pub mod scheduling_record;
pub mod sm2;
pub mod word;
pub mod word_list;

pub use catalog::Catalog;
pub use grade::Grade;
pub use review_data::ReviewState;
pub use review_session::ReviewSession;
pub use scheduling_record::{RecordId, SchedulingRecord, Subject};
pub use word::Word;
pub use word_list::WordList;
