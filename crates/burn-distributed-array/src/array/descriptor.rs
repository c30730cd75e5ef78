use alloc::string::String;
use alloc::vec::Vec;

use crate::{ArrayShape, BlockSizes, ElementType, Error, MAX_DIM, Result};

/// Describes a distributed array to create over a process group.
///
/// Every process of the group must supply an identical descriptor (same dimensions, block sizes
/// and element type); the group reference itself is naturally process-local.
#[derive(Debug)]
pub struct ArrayDescriptor<'g, C> {
    group: &'g C,
    element: ElementType,
    shape: ArrayShape,
    blocks: BlockSizes,
    name: Option<String>,
}

impl<'g, C> ArrayDescriptor<'g, C> {
    /// Process group the array is distributed over.
    pub fn group(&self) -> &'g C {
        self.group
    }

    /// Type of the elements.
    pub fn element(&self) -> &ElementType {
        &self.element
    }

    /// Extents of every dimension.
    pub fn shape(&self) -> &ArrayShape {
        &self.shape
    }

    /// Requested block sizes, `0` where the planner decides.
    pub fn blocks(&self) -> &BlockSizes {
        &self.blocks
    }

    /// Diagnostic name of the array.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Checks the descriptor without talking to other processes.
    pub fn validate(&self) -> Result<()> {
        validate(&self.shape, &self.blocks)
    }
}

fn validate(shape: &[usize], blocks: &[usize]) -> Result<()> {
    if shape.is_empty() || shape.len() > MAX_DIM {
        return Err(Error::DimensionCount {
            ndim: shape.len(),
            max: MAX_DIM,
        });
    }
    if blocks.len() != shape.len() {
        return Err(Error::BlockCountMismatch {
            expected: shape.len(),
            actual: blocks.len(),
        });
    }
    for (dim, (&extent, &block)) in shape.iter().zip(blocks).enumerate() {
        if extent < 1 || i64::try_from(extent).is_err() {
            return Err(Error::InvalidExtent { dim, extent });
        }
        if block > extent {
            return Err(Error::BlockExceedsExtent { dim, block, extent });
        }
    }
    Ok(())
}

/// A builder for constructing an [`ArrayDescriptor`].
///
/// The element type and the extents are required; block sizes default to `0` (planner decides)
/// and the name is optional. [`ArrayDescriptorBuilder::build`] validates the result locally.
#[derive(Debug)]
pub struct ArrayDescriptorBuilder<'g, C> {
    group: &'g C,
    element: Option<ElementType>,
    dims: Option<Vec<usize>>,
    blocks: Option<Vec<usize>>,
    name: Option<String>,
}

impl<'g, C> ArrayDescriptorBuilder<'g, C> {
    /// Creates a new [`ArrayDescriptorBuilder`] for an array over `group`.
    pub fn new(group: &'g C) -> Self {
        Self {
            group,
            element: None,
            dims: None,
            blocks: None,
            name: None,
        }
    }

    /// Sets the type of the elements.
    pub fn with_element<E: Into<ElementType>>(mut self, element: E) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Sets the extent of every dimension.
    ///
    /// # Example
    ///
    /// ```rust
    /// use burn_distributed_array::{ArrayDescriptorBuilder, LocalGroup};
    /// use burn_tensor::DType;
    ///
    /// let group = LocalGroup::new(1).remove(0);
    /// let descriptor = ArrayDescriptorBuilder::new(&group)
    ///     .with_element(DType::F32)
    ///     .with_dims([100, 40])
    ///     .with_blocks([10, 0])
    ///     .with_name("pressure")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(&**descriptor.shape(), &[100, 40]);
    /// ```
    ///
    /// Here the first dimension is cut in blocks of 10 elements, while the planner is free to
    /// split the second one as it sees fit.
    pub fn with_dims<S: Into<Vec<usize>>>(mut self, dims: S) -> Self {
        self.dims = Some(dims.into());
        self
    }

    /// Sets the requested block size of every dimension.
    pub fn with_blocks<S: Into<Vec<usize>>>(mut self, blocks: S) -> Self {
        self.blocks = Some(blocks.into());
        self
    }

    /// Attaches a diagnostic name.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds an [`ArrayDescriptor`] from the current configuration.
    ///
    /// # Returns
    /// The descriptor if it is locally valid, or the first problem found.
    pub fn build(self) -> Result<ArrayDescriptor<'g, C>> {
        let element = self.element.ok_or(Error::MissingArgument("element type"))?;
        let dims = self.dims.ok_or(Error::MissingArgument("dims"))?;
        let blocks = self.blocks.unwrap_or_else(|| alloc::vec![0; dims.len()]);

        validate(&dims, &blocks)?;

        Ok(ArrayDescriptor {
            group: self.group,
            element,
            shape: ArrayShape::new(&dims)?,
            blocks: BlockSizes::new(&blocks)?,
            name: self.name,
        })
    }
}
