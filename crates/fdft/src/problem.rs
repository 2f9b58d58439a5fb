//! Transform problems.
//!
//! A [`Problem`] is the immutable, canonical description of one transform:
//! kind, transform and vector tensors, sign, buffer class and flags. Every
//! problem (including sub-problems built by solvers) goes through
//! [`ProblemBuilder::build`], which validates and canonicalizes it, so two
//! problems describing the same index space compare and hash equal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FftError;
use crate::flags::ProblemFlags;
use crate::tensor::{IoDim, MAX_RANK, Tensor};

/// Closed set of transform kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemKind {
    /// Complex DFT over interleaved `(re, im)` pairs.
    Dft,
    /// Real to halfcomplex (forward real DFT).
    R2hc,
    /// Halfcomplex to real (unnormalized inverse).
    Hc2r,
    /// DCT-II.
    Redft10,
    /// DCT-III.
    Redft01,
    /// DST-II.
    Rodft10,
    /// DST-III.
    Rodft01,
}

impl ProblemKind {
    pub const ALL: [Self; 7] = [
        Self::Dft,
        Self::R2hc,
        Self::Hc2r,
        Self::Redft10,
        Self::Redft01,
        Self::Rodft10,
        Self::Rodft01,
    ];

    /// `f64` values per element.
    #[must_use]
    pub const fn element_width(self) -> usize {
        match self {
            Self::Dft => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::Dft)
    }

    #[must_use]
    pub const fn is_halfcomplex(self) -> bool {
        matches!(self, Self::R2hc | Self::Hc2r)
    }

    #[must_use]
    pub const fn is_trigonometric(self) -> bool {
        matches!(
            self,
            Self::Redft10 | Self::Redft01 | Self::Rodft10 | Self::Rodft01
        )
    }

    /// Sign implied by the kind; `None` for `Dft`, which takes either.
    #[must_use]
    pub const fn fixed_sign(self) -> Option<i32> {
        match self {
            Self::Dft => None,
            Self::R2hc => Some(-1),
            Self::Hc2r => Some(1),
            Self::Redft10 | Self::Redft01 | Self::Rodft10 | Self::Rodft01 => Some(0),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dft => "dft",
            Self::R2hc => "r2hc",
            Self::Hc2r => "hc2r",
            Self::Redft10 => "redft10",
            Self::Redft01 => "redft01",
            Self::Rodft10 => "rodft10",
            Self::Rodft01 => "rodft01",
        }
    }

    const fn tag(self) -> u8 {
        match self {
            Self::Dft => 0,
            Self::R2hc => 1,
            Self::Hc2r => 2,
            Self::Redft10 => 3,
            Self::Redft01 => 4,
            Self::Rodft10 => 5,
            Self::Rodft01 => 6,
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alignment class of the buffers a problem will be executed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Alignment {
    /// Both buffers start on a [`SIMD_ALIGNMENT`]-byte boundary.
    Aligned,
    #[default]
    Unaligned,
}

/// Byte alignment required by the vectorized kernels.
pub const SIMD_ALIGNMENT: usize = 16;

impl Alignment {
    /// Alignment class of an actual buffer.
    #[must_use]
    pub fn of(buffer: &[f64]) -> Self {
        if (buffer.as_ptr() as usize) % SIMD_ALIGNMENT == 0 {
            Self::Aligned
        } else {
            Self::Unaligned
        }
    }
}

/// Buffer layout class: in-place or not, and alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BufferClass {
    pub in_place: bool,
    pub alignment: Alignment,
}

/// 128-bit structural hash of a problem plus planner context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProblemHash([u8; 16]);

impl ProblemHash {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse exactly 32 lowercase or uppercase hex digits.
    #[must_use]
    pub fn from_hex(text: &str) -> Option<Self> {
        if text.len() != 32 || !text.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&text[2 * i..2 * i + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for ProblemHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ProblemHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProblemHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).ok_or_else(|| serde::de::Error::custom("expected 32 hex digits"))
    }
}

/// Immutable, canonical transform problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Problem {
    kind: ProblemKind,
    sz: Tensor,
    vecsz: Tensor,
    buffers: BufferClass,
    sign: i32,
    flags: ProblemFlags,
}

impl Problem {
    #[must_use]
    pub fn builder(kind: ProblemKind) -> ProblemBuilder {
        ProblemBuilder::new(kind)
    }

    /// Contiguous, out-of-place complex DFT of length `n`.
    pub fn dft_1d(n: usize, sign: i32) -> Result<Self, FftError> {
        Self::dft_rowmajor(&[n], sign)
    }

    /// Contiguous row-major, out-of-place complex DFT.
    pub fn dft_rowmajor(n: &[usize], sign: i32) -> Result<Self, FftError> {
        Self::builder(ProblemKind::Dft)
            .dims(Tensor::rowmajor(n, 1, 1).dims())
            .sign(sign)
            .build()
    }

    /// Contiguous, out-of-place real transform of length `n`.
    pub fn r2r_1d(kind: ProblemKind, n: usize) -> Result<Self, FftError> {
        Self::builder(kind)
            .dims(&[IoDim::new(n, 1, 1)])
            .build()
    }

    /// Builder pre-filled with this problem's kind, sign, buffer class and
    /// flags, with empty tensors. Solvers derive sub-problems through it.
    #[must_use]
    pub fn derive(&self) -> ProblemBuilder {
        ProblemBuilder {
            kind: self.kind,
            dims: Vec::new(),
            vector_dims: Vec::new(),
            sign: Some(self.sign),
            in_place: self.buffers.in_place,
            alignment: self.buffers.alignment,
            flags: self.flags,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ProblemKind {
        self.kind
    }

    #[must_use]
    pub const fn sz(&self) -> &Tensor {
        &self.sz
    }

    #[must_use]
    pub const fn vecsz(&self) -> &Tensor {
        &self.vecsz
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.sz.rank()
    }

    #[must_use]
    pub fn vector_rank(&self) -> usize {
        self.vecsz.rank()
    }

    #[must_use]
    pub const fn sign(&self) -> i32 {
        self.sign
    }

    #[must_use]
    pub const fn flags(&self) -> ProblemFlags {
        self.flags
    }

    #[must_use]
    pub const fn buffers(&self) -> BufferClass {
        self.buffers
    }

    #[must_use]
    pub const fn is_in_place(&self) -> bool {
        self.buffers.in_place
    }

    #[must_use]
    pub const fn alignment(&self) -> Alignment {
        self.buffers.alignment
    }

    #[must_use]
    pub const fn element_width(&self) -> usize {
        self.kind.element_width()
    }

    /// Whether plans may overwrite the input array.
    #[must_use]
    pub const fn may_destroy_input(&self) -> bool {
        self.buffers.in_place || self.flags.contains(ProblemFlags::DESTROY_INPUT)
    }

    /// Elements the input buffer must hold.
    #[must_use]
    pub fn input_extent(&self) -> usize {
        self.sz.input_span().unwrap_or(0) + self.vecsz.input_span().unwrap_or(0) + 1
    }

    /// Elements the output buffer must hold.
    #[must_use]
    pub fn output_extent(&self) -> usize {
        self.sz.output_span().unwrap_or(0) + self.vecsz.output_span().unwrap_or(0) + 1
    }

    /// Elements an in-place buffer must hold.
    #[must_use]
    pub fn extent(&self) -> usize {
        self.input_extent().max(self.output_extent())
    }

    /// Number of transforms times transform size.
    #[must_use]
    pub fn total_points(&self) -> usize {
        self.sz.size() * self.vecsz.size()
    }

    /// blake3 over a tagged encoding of the problem and the planner's
    /// thread count, truncated to 128 bits. Buffer addresses never enter
    /// the hash.
    #[must_use]
    pub fn structural_hash(&self, nthreads: usize) -> ProblemHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"fdft-problem\0");
        hasher.update(&[self.kind.tag()]);
        hasher.update(&self.sign.to_le_bytes());
        hasher.update(&[self.flags.bits()]);
        for (tag, tensor) in [(b"sz", &self.sz), (b"vs", &self.vecsz)] {
            hasher.update(tag);
            hasher.update(&(tensor.rank() as u64).to_le_bytes());
            for d in tensor.dims() {
                hasher.update(&(d.n as u64).to_le_bytes());
                hasher.update(&(d.is as u64).to_le_bytes());
                hasher.update(&(d.os as u64).to_le_bytes());
            }
        }
        hasher.update(&[
            u8::from(self.buffers.in_place),
            u8::from(self.buffers.alignment == Alignment::Aligned),
        ]);
        hasher.update(&(nthreads as u64).to_le_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        ProblemHash(bytes)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} sign={}", self.kind, self.sign)?;
        for (label, tensor) in [("sz", &self.sz), ("vecsz", &self.vecsz)] {
            write!(f, " {label}=[")?;
            for (i, d) in tensor.dims().iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}:{}:{}", d.n, d.is, d.os)?;
            }
            f.write_str("]")?;
        }
        if self.buffers.in_place {
            f.write_str(" in-place")?;
        }
        f.write_str(")")
    }
}

/// Validating constructor for [`Problem`].
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    kind: ProblemKind,
    dims: Vec<IoDim>,
    vector_dims: Vec<IoDim>,
    sign: Option<i32>,
    in_place: bool,
    alignment: Alignment,
    flags: ProblemFlags,
}

impl ProblemBuilder {
    #[must_use]
    pub fn new(kind: ProblemKind) -> Self {
        Self {
            kind,
            dims: Vec::new(),
            vector_dims: Vec::new(),
            sign: None,
            in_place: false,
            alignment: Alignment::default(),
            flags: ProblemFlags::empty(),
        }
    }

    #[must_use]
    pub fn dims(mut self, dims: &[IoDim]) -> Self {
        self.dims = dims.to_vec();
        self
    }

    #[must_use]
    pub fn vector_dims(mut self, dims: &[IoDim]) -> Self {
        self.vector_dims = dims.to_vec();
        self
    }

    #[must_use]
    pub fn tensors(self, sz: &Tensor, vecsz: &Tensor) -> Self {
        self.dims(sz.dims()).vector_dims(vecsz.dims())
    }

    #[must_use]
    pub fn sign(mut self, sign: i32) -> Self {
        self.sign = Some(sign);
        self
    }

    #[must_use]
    pub fn in_place(mut self, in_place: bool) -> Self {
        self.in_place = in_place;
        self
    }

    #[must_use]
    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Derive the buffer class from the buffers the plan will run on:
    /// in-place when `output` is `None` or starts where `input` does.
    #[must_use]
    pub fn with_buffers(mut self, input: &[f64], output: Option<&[f64]>) -> Self {
        self.in_place = output.is_none_or(|out| std::ptr::eq(out.as_ptr(), input.as_ptr()));
        let aligned = Alignment::of(input) == Alignment::Aligned
            && output.is_none_or(|out| Alignment::of(out) == Alignment::Aligned);
        self.alignment = if aligned {
            Alignment::Aligned
        } else {
            Alignment::Unaligned
        };
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: ProblemFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn build(self) -> Result<Problem, FftError> {
        let Self {
            kind,
            mut dims,
            vector_dims,
            sign,
            in_place,
            alignment,
            mut flags,
        } = self;

        if dims.len() > MAX_RANK || vector_dims.len() > MAX_RANK {
            return Err(FftError::InvalidShape {
                detail: "tensor rank exceeds 32",
            });
        }
        if dims.iter().chain(&vector_dims).any(|d| d.n == 0) {
            return Err(FftError::InvalidShape {
                detail: "dimension sizes must be greater than zero",
            });
        }
        if flags.contains(ProblemFlags::PRESERVE_INPUT | ProblemFlags::DESTROY_INPUT) {
            return Err(FftError::InvalidShape {
                detail: "PRESERVE_INPUT contradicts DESTROY_INPUT",
            });
        }

        let sign = match (kind.fixed_sign(), sign) {
            (None, None) => -1,
            (None, Some(s @ (-1 | 1))) => s,
            (None, Some(_)) => {
                return Err(FftError::InvalidShape {
                    detail: "dft sign must be -1 or +1",
                });
            }
            (Some(fixed), None) => fixed,
            (Some(fixed), Some(s)) if s == fixed => s,
            (Some(_), Some(_)) => {
                return Err(FftError::InvalidShape {
                    detail: "sign does not match the transform kind",
                });
            }
        };

        if flags.contains(ProblemFlags::TRANSPOSED_OUT) {
            if dims.len() < 2 {
                return Err(FftError::InvalidShape {
                    detail: "TRANSPOSED_OUT requires transform rank >= 2",
                });
            }
            let os1 = dims[1].os;
            dims[0].os = os1;
            dims[1].os = os1.checked_mul(dims[0].n).ok_or(FftError::InvalidShape {
                detail: "transposed output stride overflows",
            })?;
            flags.remove(ProblemFlags::TRANSPOSED_OUT);
        }

        let sz = Tensor::new(dims);
        let vecsz = Tensor::new(vector_dims);
        sz.checked_size()
            .and_then(|a| vecsz.checked_size().and_then(|b| a.checked_mul(b)))
            .ok_or(FftError::InvalidShape {
                detail: "problem size overflows",
            })?;
        let spans = [
            sz.input_span().zip(vecsz.input_span()),
            sz.output_span().zip(vecsz.output_span()),
        ];
        for span in spans {
            let fits = span
                .and_then(|(a, b)| a.checked_add(b))
                .and_then(|s| s.checked_add(1))
                .and_then(|s| s.checked_mul(kind.element_width()))
                .is_some();
            if !fits {
                return Err(FftError::InvalidShape {
                    detail: "strides overflow the address space",
                });
            }
        }

        if in_place {
            flags.remove(ProblemFlags::PRESERVE_INPUT);
        }

        // A size-one DCT/DST is not the identity (type II doubles), so
        // trigonometric kinds keep their unit dimensions.
        let sz = if kind.is_trigonometric() {
            sz.sorted()
        } else {
            sz.compress()
        };
        Ok(Problem {
            kind,
            sz,
            vecsz: vecsz.compress_contiguous(),
            buffers: BufferClass {
                in_place,
                alignment,
            },
            sign,
            flags,
        })
    }
}
