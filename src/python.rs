use pyo3::buffer::PyBuffer;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;

use crate::{compress, Error};

pyo3::create_exception!(lzduo, LzduoError, PyException, "Any kind of error.");

// Custom Python exception classes for each lzduo::Error variant
pyo3::create_exception!(lzduo, InvalidInputError, LzduoError, "The input buffer could not be accessed as a contiguous byte view.");
pyo3::create_exception!(lzduo, InputTooLargeError, LzduoError, "Input is longer than the frame's 16-bit body-length field can describe.");
pyo3::create_exception!(lzduo, CapacityExceededError, LzduoError, "Both window geometries overran the output ceiling.");
pyo3::create_exception!(lzduo, OutputOverrunError, LzduoError, "Destination buffer was not large enough to store the selected frame.");

// Helper function to convert lzduo::Error to appropriate Python exception
fn lzduo_error_to_pyerr(error: Error) -> PyErr {
    match error {
        Error::InvalidInput => InvalidInputError::new_err("invalid input"),
        Error::InputTooLarge => InputTooLargeError::new_err("input too large"),
        Error::CapacityExceeded => CapacityExceededError::new_err("capacity exceeded"),
        Error::OutputOverrun => OutputOverrunError::new_err("output overrun"),
    }
}

/// Compress a bytes-like object into a single frame.
#[pyfunction(name = "compress")]
fn py_compress(py: Python<'_>, data: &Bound<'_, PyAny>) -> PyResult<Vec<u8>> {
    let buffer = PyBuffer::<u8>::get(data).map_err(|_| lzduo_error_to_pyerr(Error::InvalidInput))?;
    let src = buffer.to_vec(py)?;

    compress::compress(&src).map_err(lzduo_error_to_pyerr)
}

/// Returns the worst-case frame size the compressor can produce.
#[pyfunction(name = "compress_worst_size")]
fn py_compress_worst_size() -> PyResult<usize> {
    Ok(compress::compress_worst_size())
}

#[pymodule]
fn lzduo(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_compress, m)?)?;
    m.add_function(wrap_pyfunction!(py_compress_worst_size, m)?)?;

    // Add exception classes to the module
    m.add("LzduoError", m.py().get_type::<LzduoError>())?;
    m.add("InvalidInputError", m.py().get_type::<InvalidInputError>())?;
    m.add("InputTooLargeError", m.py().get_type::<InputTooLargeError>())?;
    m.add("CapacityExceededError", m.py().get_type::<CapacityExceededError>())?;
    m.add("OutputOverrunError", m.py().get_type::<OutputOverrunError>())?;

    Ok(())
}
