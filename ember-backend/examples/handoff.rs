//! A producer thread hands images to the engine thread, which releases them
//! back through the release queue.

use std::ffi::c_void;
use std::thread;

use ember_backend::{ExternalImage, ReleaseQueue};

fn release_image(image: *mut c_void, _user: *mut c_void) {
    log::info!("producer got image {image:?} back on {:?}", thread::current().id());
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Trace)
        .init();

    // The engine thread owns the queue; it is the designated context for
    // release callbacks.
    let queue = ReleaseQueue::new();
    let sender = queue.sender();

    let producer = thread::spawn(move || {
        for frame in 1..=3usize {
            let handle = ExternalImage::with_callback(
                frame as *mut c_void,
                release_image,
                std::ptr::null_mut(),
            );
            log::info!("producer hands off {handle:?}");
            sender.release(handle).expect("engine is running");
        }
    });
    producer.join().unwrap();

    let released = queue.drain();
    log::info!("engine released {released} image(s)");
}
