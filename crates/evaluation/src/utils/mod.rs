pub mod frame_processing;
