// Display pipeline: downscaling, JPEG compression and live frame delivery.

pub mod compress;
pub mod feed;
