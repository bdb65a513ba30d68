use std::future::Future;


/// Enable better error messages if our code ever panics
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}


/// Routes `tracing` events to the browser console
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .build()
    );
}


/// Executes an async Future on the current thread
#[cfg(target_arch = "wasm32")]
#[inline(always)]
pub fn execute_future<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}

/// Executes an async Future on the current thread
#[cfg(not(target_arch = "wasm32"))]
pub fn execute_future<F: Future<Output = ()> + 'static>(f: F) {
    futures::executor::block_on(f);
}


/// Check if a float is zero
#[inline(always)]
pub fn is_float_zero(x: f32, threshold: f32) -> bool {
    x.abs() < threshold
}


/// Check if two floats are equal
#[inline(always)]
pub fn are_floats_equal(x: f32, y: f32, threshold: f32) -> bool {
    is_float_zero(x - y, threshold)
}
