pub mod playback_driver;
