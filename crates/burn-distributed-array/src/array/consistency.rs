use alloc::format;
use alloc::vec;

use crate::{ArrayShape, BlockSizes, Communicator, ElementType, Error, MAX_DIM, Result};

const NDIM: usize = 0;
const PREDEFINED: usize = 1 + 2 * MAX_DIM;
const ELEMENT_SIZE: usize = PREDEFINED + 1;
const FIELDS: usize = ELEMENT_SIZE + 1;

/// Verifies that every process of `group` passed the same shape, block sizes and element type.
/// Collective.
///
/// Each value `v` is encoded as the pair `(v, -v)`; after a group-wide maximum the pair reads
/// `(max v, -min v)`, which are opposite only when every process holds the same `v`. Unused
/// dimensions encode zeros so the buffer length is the same on every process whatever its
/// local `ndim`. The element type is compared through the substrate's view of it: whether it
/// is predefined and its size.
pub(crate) fn check<C: Communicator>(
    group: &C,
    shape: &ArrayShape,
    blocks: &BlockSizes,
    element: &ElementType,
) -> Result<()> {
    let mut buffer = vec![0i64; 2 * FIELDS];

    let ndim = signed(shape.ndim(), |value| Error::DimensionCount {
        ndim: value,
        max: MAX_DIM,
    })?;
    encode(&mut buffer, NDIM, ndim);
    for dim in 0..shape.ndim() {
        let extent = signed(shape[dim], |extent| Error::InvalidExtent { dim, extent })?;
        let block = signed(blocks[dim], |block| Error::BlockExceedsExtent {
            dim,
            block,
            extent: shape[dim],
        })?;
        encode(&mut buffer, 1 + 2 * dim, extent);
        encode(&mut buffer, 2 + 2 * dim, block);
    }
    let size = signed(group.type_size(element), |_| {
        Error::UnsupportedElementType(element.describe())
    })?;
    encode(&mut buffer, PREDEFINED, i64::from(group.is_predefined(element)));
    encode(&mut buffer, ELEMENT_SIZE, size);

    group.all_reduce_max(&mut buffer)?;

    if !agrees(&buffer, NDIM) {
        return Err(Error::InconsistentArguments {
            field: "number of dimensions".into(),
        });
    }
    for dim in 0..MAX_DIM {
        if !agrees(&buffer, 1 + 2 * dim) {
            return Err(Error::InconsistentArguments {
                field: format!("extent of dimension {dim}"),
            });
        }
        if !agrees(&buffer, 2 + 2 * dim) {
            return Err(Error::InconsistentArguments {
                field: format!("block size of dimension {dim}"),
            });
        }
    }
    if !agrees(&buffer, PREDEFINED) || !agrees(&buffer, ELEMENT_SIZE) {
        return Err(Error::InconsistentArguments {
            field: "element type".into(),
        });
    }
    Ok(())
}

fn signed(value: usize, err: impl FnOnce(usize) -> Error) -> Result<i64> {
    i64::try_from(value).map_err(|_| err(value))
}

fn encode(buffer: &mut [i64], field: usize, value: i64) {
    buffer[2 * field] = value;
    buffer[2 * field + 1] = -value;
}

fn agrees(buffer: &[i64], field: usize) -> bool {
    buffer[2 * field] == -buffer[2 * field + 1]
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::{Dims, LocalGroup};
    use alloc::vec::Vec;
    use burn_tensor::DType;

    type Arguments = (&'static [usize], &'static [usize]);

    fn run(arguments: [Arguments; 3]) -> Vec<Result<()>> {
        run_with(arguments, [ElementType::Scalar(DType::F32); 3])
    }

    fn run_with(arguments: [Arguments; 3], elements: [ElementType; 3]) -> Vec<Result<()>> {
        LocalGroup::run(LocalGroup::new(3), |group| {
            let (shape, blocks) = arguments[group.rank()];
            let shape = Dims::new(shape).unwrap();
            check(&group, &shape, &Dims::new(blocks).unwrap(), &elements[group.rank()])
        })
    }

    #[test]
    fn test_identical_arguments_agree() {
        let results = run([(&[10, 20], &[0, 5]); 3]);

        assert!(results.iter().all(Result::is_ok));
    }

    #[test]
    fn test_one_different_extent_fails_everywhere() {
        let results = run([
            (&[10, 20], &[0, 5]),
            (&[11, 20], &[0, 5]),
            (&[10, 20], &[0, 5]),
        ]);

        let expected = Err(Error::InconsistentArguments {
            field: "extent of dimension 0".into(),
        });
        assert!(results.iter().all(|result| *result == expected));
    }

    #[test]
    fn test_different_block_sizes_fail_everywhere() {
        let results = run([
            (&[10, 20], &[0, 5]),
            (&[10, 20], &[0, 5]),
            (&[10, 20], &[0, 4]),
        ]);

        let expected = Err(Error::InconsistentArguments {
            field: "block size of dimension 1".into(),
        });
        assert!(results.iter().all(|result| *result == expected));
    }

    #[test]
    fn test_different_dimension_counts_fail_everywhere() {
        let results = run([
            (&[10, 20], &[0, 0]),
            (&[10, 20, 1], &[0, 0, 0]),
            (&[10, 20], &[0, 0]),
        ]);

        let expected = Err(Error::InconsistentArguments {
            field: "number of dimensions".into(),
        });
        assert!(results.iter().all(|result| *result == expected));
    }

    #[test]
    fn test_different_element_types_fail_everywhere() {
        let arguments: Arguments = (&[8], &[0]);
        let results = run_with(
            [arguments; 3],
            [
                ElementType::Scalar(DType::F32),
                ElementType::Derived { size: 4 },
                ElementType::Scalar(DType::F32),
            ],
        );

        let expected = Err(Error::InconsistentArguments {
            field: "element type".into(),
        });
        assert!(results.iter().all(|result| *result == expected));
    }

    #[test]
    fn test_element_sizes_are_compared() {
        let arguments: Arguments = (&[8], &[0]);
        let results = run_with(
            [arguments; 3],
            [
                ElementType::Scalar(DType::F32),
                ElementType::Scalar(DType::F32),
                ElementType::Scalar(DType::F64),
            ],
        );

        assert!(results.iter().all(Result::is_err));
    }
}
