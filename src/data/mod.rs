pub mod dataset;
pub mod image_folder;
pub mod loader;
pub mod sample;
pub mod transform;

pub use dataset::{Dataset, InMemoryDataset};
pub use image_folder::ImageFolder;
pub use loader::{Batches, DataLoader};
pub use sample::{Batch, ImageShape, Sample};
pub use transform::{Normalize, RandomHorizontalFlip, Transform};
