mod session;

pub use session::{Participant, TestSession};
