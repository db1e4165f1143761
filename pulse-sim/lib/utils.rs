//! Small filesystem and output conveniences.

/// Create a directory and all of its parents, panicking on failure.
#[macro_export]
macro_rules! mkdir {
    ( $dir:expr ) => {
        std::fs::create_dir_all(&$dir)
            .unwrap_or_else(|e| {
                panic!("error creating directory {:?}: {}", $dir, e)
            })
    }
}

/// Write a series of named arrays to a `.npz` archive, panicking on failure.
///
/// Expected call syntax:
/// ```ignore
/// write_npz!(
///     path,
///     arrays: {
///         "array0" => &array0,
///         "array1" => &array1,
///     }
/// );
/// ```
#[macro_export]
macro_rules! write_npz {
    (
        $path:expr,
        arrays: { $( $name:expr => $arr:expr ),* $(,)? }
    ) => {
        {
            let mut npz =
                $crate::ndarray_npy::NpzWriter::new(
                    std::fs::File::create(&$path)
                        .unwrap_or_else(|e| {
                            panic!("error creating file {:?}: {}", $path, e)
                        })
                );
            $(
                npz.add_array($name, $arr)
                    .unwrap_or_else(|e| {
                        panic!("error writing array {:?}: {}", $name, e)
                    });
            )*
            npz.finish()
                .unwrap_or_else(|e| {
                    panic!("error finalizing file {:?}: {}", $path, e)
                });
        }
    }
}
