pub mod completion;
pub mod course;
pub mod module;
pub mod profile;

pub use completion::{Completion, CompletionSet};
pub use course::Course;
pub use module::Module;
pub use profile::{Profile, ProfileEditRequest, ProfilePatch, Theme, ThemeRequest};
