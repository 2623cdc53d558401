//! Testing utilities for the content studio workspace
//!
//! Shared fixtures: in-memory diagnostics, flaky operations, PNG builders.

#![allow(missing_docs)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, Rgba, RgbaImage};
use std::future::Future;
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use studio_diagnostics::Diagnostics;

pub fn test_diagnostics() -> Arc<Diagnostics> {
    Arc::new(Diagnostics::in_memory())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FlakyError(pub String);

/// Operation failing a fixed number of times before succeeding
#[derive(Debug)]
pub struct FlakyOperation {
    failures: u32,
    message: String,
    calls: AtomicU32,
}

impl FlakyOperation {
    pub fn new(failures: u32, message: &str) -> Self {
        Self {
            failures,
            message: message.to_string(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_failing(message: &str) -> Self {
        Self::new(u32::MAX, message)
    }

    /// One invocation; resolves to the 1-based call number on success
    pub fn call(&self) -> impl Future<Output = Result<u32, FlakyError>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let result = if call <= self.failures {
            Err(FlakyError(self.message.clone()))
        } else {
            Ok(call)
        };
        async move { result }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn png_base64(image: &RgbaImage) -> String {
    STANDARD.encode(png_bytes(image))
}

pub fn solid_png_base64(width: u32, height: u32, pixel: [u8; 4]) -> String {
    png_base64(&RgbaImage::from_pixel(width, height, Rgba(pixel)))
}

/// Single-row image from the given pixels
pub fn row_png_base64(pixels: &[[u8; 4]]) -> String {
    let width = u32::try_from(pixels.len()).unwrap();
    let image = RgbaImage::from_fn(width, 1, |x, _| Rgba(pixels[x as usize]));
    png_base64(&image)
}

pub fn decode_png_base64(data: &str) -> RgbaImage {
    let bytes = STANDARD.decode(data).unwrap();
    image::load_from_memory_with_format(&bytes, ImageFormat::Png)
        .unwrap()
        .to_rgba8()
}
