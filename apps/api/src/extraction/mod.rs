// Intake: document bytes -> plain text -> contact details.
// Text extraction is CPU-bound and runs on the blocking pool; contact
// extraction is a cheap pass over the resulting text.

pub mod contact;
pub mod text;

pub use contact::extract_contacts;
pub use text::TextExtractor;
