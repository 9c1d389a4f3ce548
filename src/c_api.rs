//! C-callable construction and destruction of fields.
//!
//! Handles are opaque pointers to the owning [`Field`]; each destructor
//! reconstructs exactly the `Field` instantiation its constructor
//! produced. Constructors return a null handle on failure and leave a
//! stable numeric code readable with [`shearwater_last_error`]. Panics
//! are caught at the boundary and never unwind into the caller.

use std::ffi::c_void;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;
use std::slice;

use crate::celldata::{Count, Payload, Scalar, Shear};
use crate::field::{Catalog, Field, FieldConfig};
use crate::geom::{FlatPoint, Position, SpherePoint};
use crate::split::SplitMethod;

/// Success.
pub const SHEARWATER_OK: i32 = 0;
/// The point count was negative or a required column pointer was null.
pub const SHEARWATER_ERR_DIMENSIONS: i32 = 1;
/// A separation, opening angle, or split-method code was invalid.
pub const SHEARWATER_ERR_PARAMETER: i32 = 2;
/// Construction panicked; the field was not built.
pub const SHEARWATER_ERR_PANIC: i32 = 3;

thread_local! {
    static LAST_ERROR: std::cell::Cell<i32> = const { std::cell::Cell::new(SHEARWATER_OK) };
}

fn set_last_error(code: i32) {
    LAST_ERROR.with(|c| c.set(code));
}

/// Error code left by the most recent constructor call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn shearwater_last_error() -> i32 {
    LAST_ERROR.with(|c| c.get())
}

unsafe fn column<'a>(ptr: *const f64, n: usize) -> Option<&'a [f64]> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { slice::from_raw_parts(ptr, n) })
    }
}

#[allow(clippy::too_many_arguments)]
unsafe fn build<P: Position, K: Payload>(
    coord1: *const f64,
    coord2: *const f64,
    g1: *const f64,
    g2: *const f64,
    k: *const f64,
    w: *const f64,
    n: i64,
    min_sep: f64,
    max_sep: f64,
    b: f64,
    split_method: i32,
) -> *mut c_void {
    set_last_error(SHEARWATER_OK);

    if n < 0 || coord1.is_null() || coord2.is_null() || w.is_null() {
        set_last_error(SHEARWATER_ERR_DIMENSIONS);
        return ptr::null_mut();
    }
    let Some(split) = SplitMethod::from_code(split_method) else {
        set_last_error(SHEARWATER_ERR_PARAMETER);
        return ptr::null_mut();
    };

    let n = n as usize;
    let catalog = Catalog {
        coord1: unsafe { slice::from_raw_parts(coord1, n) },
        coord2: unsafe { slice::from_raw_parts(coord2, n) },
        g1: unsafe { column(g1, n) },
        g2: unsafe { column(g2, n) },
        k: unsafe { column(k, n) },
        w: unsafe { slice::from_raw_parts(w, n) },
    };
    let config = FieldConfig {
        min_sep,
        max_sep,
        b,
        split,
        ..FieldConfig::default()
    };

    match catch_unwind(AssertUnwindSafe(|| Field::<P, K>::new(&catalog, &config))) {
        Ok(Ok(field)) => Box::into_raw(Box::new(field)) as *mut c_void,
        Ok(Err(err)) => {
            set_last_error(err.code());
            ptr::null_mut()
        }
        Err(_) => {
            set_last_error(SHEARWATER_ERR_PANIC);
            ptr::null_mut()
        }
    }
}

unsafe fn destroy<P: Position, K: Payload>(handle: *mut c_void) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle as *mut Field<P, K>) });
}

unsafe fn n_top_level<P: Position, K: Payload>(handle: *const c_void) -> i64 {
    if handle.is_null() {
        return 0;
    }
    let field = unsafe { &*(handle as *const Field<P, K>) };
    field.n_top_level() as i64
}

/// Build a shear field over flat-sky coordinates (x, y).
///
/// `split_method`: 0 = Mean, 1 = Median, 2 = Middle, 3 = Random.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn shearwater_build_shear_field_flat(
    x: *const f64,
    y: *const f64,
    g1: *const f64,
    g2: *const f64,
    w: *const f64,
    n: i64,
    min_sep: f64,
    max_sep: f64,
    b: f64,
    split_method: i32,
) -> *mut c_void {
    unsafe {
        build::<FlatPoint, Shear>(x, y, g1, g2, ptr::null(), w, n, min_sep, max_sep, b, split_method)
    }
}

/// Build a shear field over (ra, dec) in radians.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn shearwater_build_shear_field_sphere(
    ra: *const f64,
    dec: *const f64,
    g1: *const f64,
    g2: *const f64,
    w: *const f64,
    n: i64,
    min_sep: f64,
    max_sep: f64,
    b: f64,
    split_method: i32,
) -> *mut c_void {
    unsafe {
        build::<SpherePoint, Shear>(
            ra,
            dec,
            g1,
            g2,
            ptr::null(),
            w,
            n,
            min_sep,
            max_sep,
            b,
            split_method,
        )
    }
}

/// Build a scalar field over flat-sky coordinates (x, y).
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn shearwater_build_scalar_field_flat(
    x: *const f64,
    y: *const f64,
    k: *const f64,
    w: *const f64,
    n: i64,
    min_sep: f64,
    max_sep: f64,
    b: f64,
    split_method: i32,
) -> *mut c_void {
    unsafe {
        build::<FlatPoint, Scalar>(
            x,
            y,
            ptr::null(),
            ptr::null(),
            k,
            w,
            n,
            min_sep,
            max_sep,
            b,
            split_method,
        )
    }
}

/// Build a scalar field over (ra, dec) in radians.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn shearwater_build_scalar_field_sphere(
    ra: *const f64,
    dec: *const f64,
    k: *const f64,
    w: *const f64,
    n: i64,
    min_sep: f64,
    max_sep: f64,
    b: f64,
    split_method: i32,
) -> *mut c_void {
    unsafe {
        build::<SpherePoint, Scalar>(
            ra,
            dec,
            ptr::null(),
            ptr::null(),
            k,
            w,
            n,
            min_sep,
            max_sep,
            b,
            split_method,
        )
    }
}

/// Build a count field over flat-sky coordinates (x, y).
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn shearwater_build_count_field_flat(
    x: *const f64,
    y: *const f64,
    w: *const f64,
    n: i64,
    min_sep: f64,
    max_sep: f64,
    b: f64,
    split_method: i32,
) -> *mut c_void {
    unsafe {
        build::<FlatPoint, Count>(
            x,
            y,
            ptr::null(),
            ptr::null(),
            ptr::null(),
            w,
            n,
            min_sep,
            max_sep,
            b,
            split_method,
        )
    }
}

/// Build a count field over (ra, dec) in radians.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn shearwater_build_count_field_sphere(
    ra: *const f64,
    dec: *const f64,
    w: *const f64,
    n: i64,
    min_sep: f64,
    max_sep: f64,
    b: f64,
    split_method: i32,
) -> *mut c_void {
    unsafe {
        build::<SpherePoint, Count>(
            ra,
            dec,
            ptr::null(),
            ptr::null(),
            ptr::null(),
            w,
            n,
            min_sep,
            max_sep,
            b,
            split_method,
        )
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_destroy_shear_field_flat(handle: *mut c_void) {
    unsafe { destroy::<FlatPoint, Shear>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_destroy_shear_field_sphere(handle: *mut c_void) {
    unsafe { destroy::<SpherePoint, Shear>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_destroy_scalar_field_flat(handle: *mut c_void) {
    unsafe { destroy::<FlatPoint, Scalar>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_destroy_scalar_field_sphere(handle: *mut c_void) {
    unsafe { destroy::<SpherePoint, Scalar>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_destroy_count_field_flat(handle: *mut c_void) {
    unsafe { destroy::<FlatPoint, Count>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_destroy_count_field_sphere(handle: *mut c_void) {
    unsafe { destroy::<SpherePoint, Count>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_shear_field_flat_n_top_level(handle: *const c_void) -> i64 {
    unsafe { n_top_level::<FlatPoint, Shear>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_shear_field_sphere_n_top_level(handle: *const c_void) -> i64 {
    unsafe { n_top_level::<SpherePoint, Shear>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_scalar_field_flat_n_top_level(handle: *const c_void) -> i64 {
    unsafe { n_top_level::<FlatPoint, Scalar>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_scalar_field_sphere_n_top_level(handle: *const c_void) -> i64 {
    unsafe { n_top_level::<SpherePoint, Scalar>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_count_field_flat_n_top_level(handle: *const c_void) -> i64 {
    unsafe { n_top_level::<FlatPoint, Count>(handle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shearwater_count_field_sphere_n_top_level(handle: *const c_void) -> i64 {
    unsafe { n_top_level::<SpherePoint, Count>(handle) }
}
