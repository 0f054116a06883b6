pub mod to_tensor;
pub mod trainable;

pub use to_tensor::{to_vec_f32, Rows, ToTensor};
pub use trainable::{TrainableAgent, TrainingMetrics};
