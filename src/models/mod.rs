pub mod openai;
pub mod settings;
pub mod shared;

pub use self::shared::{ModelDescriptor, SamplingParams};
