pub mod background;
pub mod blob_extractor;
pub mod calibration;
pub mod change_detector;
pub mod circular_buffer;
pub mod frame;
pub mod morphology;
pub mod threshold;
pub mod utils;
