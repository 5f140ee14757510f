//! Boolean pixel grids: ground-truth masks, labeled regions and predictions.
use crate::error::{CosegError, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    pub w: usize,
    pub h: usize,
    pub data: Vec<bool>,
}

impl Mask {
    pub fn new(w: usize, h: usize, data: Vec<bool>) -> Result<Self> {
        if data.len() != w * h {
            return Err(CosegError::invalid(
                "data",
                format!("expected {} mask cells for {w}x{h}, got {}", w * h, data.len()),
            ));
        }
        Ok(Self { w, h, data })
    }

    pub fn filled(w: usize, h: usize, value: bool) -> Self {
        Self {
            w,
            h,
            data: vec![value; w * h],
        }
    }

    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        Self { w, h, data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        let i = y * self.w + x;
        self.data[i] = v;
    }

    /// Number of `true` cells.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Cell-wise complement.
    pub fn inverted(&self) -> Self {
        Self {
            w: self.w,
            h: self.h,
            data: self.data.iter().map(|&v| !v).collect(),
        }
    }
}

crate::image::traits::impl_owned_view!(Mask, bool);
