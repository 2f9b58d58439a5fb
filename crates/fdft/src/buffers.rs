//! Safe strided views over the arrays a plan reads and writes.
//!
//! Offsets and strides are counted in elements. Complex elements occupy
//! two consecutive `f64`s (`re`, `im`); real elements occupy one.

/// Base offsets (in elements) of one plan invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offsets {
    pub input: usize,
    pub output: usize,
}

impl Offsets {
    pub const ZERO: Self = Self::new(0, 0);

    #[must_use]
    pub const fn new(input: usize, output: usize) -> Self {
        Self { input, output }
    }

    /// Both offsets advanced by `(di, do_)`.
    #[must_use]
    pub const fn advance(self, di: usize, do_: usize) -> Self {
        Self::new(self.input + di, self.output + do_)
    }

    /// The output offset used for both directions.
    #[must_use]
    pub const fn on_output(self) -> Self {
        Self::new(self.output, self.output)
    }

    /// The input offset used for both directions.
    #[must_use]
    pub const fn on_input(self) -> Self {
        Self::new(self.input, self.input)
    }
}

/// Input and output arrays of one execution. `output == None` means the
/// transform runs in place on `input`.
#[derive(Debug)]
pub struct Buffers<'a> {
    input: &'a mut [f64],
    output: Option<&'a mut [f64]>,
}

impl<'a> Buffers<'a> {
    #[must_use]
    pub fn out_of_place(input: &'a mut [f64], output: &'a mut [f64]) -> Self {
        Self {
            input,
            output: Some(output),
        }
    }

    #[must_use]
    pub fn in_place(data: &'a mut [f64]) -> Self {
        Self {
            input: data,
            output: None,
        }
    }

    #[must_use]
    pub fn is_in_place(&self) -> bool {
        self.output.is_none()
    }

    pub fn reborrow(&mut self) -> Buffers<'_> {
        Buffers {
            input: &mut *self.input,
            output: self.output.as_deref_mut(),
        }
    }

    /// In-place view over the output array.
    pub fn output_only(&mut self) -> Buffers<'_> {
        match self.output.as_deref_mut() {
            Some(output) => Buffers::in_place(output),
            None => Buffers::in_place(&mut *self.input),
        }
    }

    /// In-place view over the input array.
    pub fn input_only(&mut self) -> Buffers<'_> {
        Buffers::in_place(&mut *self.input)
    }

    /// This input paired with a caller-provided output array.
    pub fn redirect_output<'b>(&'b mut self, output: &'b mut [f64]) -> Buffers<'b> {
        Buffers::out_of_place(&mut *self.input, output)
    }

    /// A caller-provided input array paired with this output array.
    pub fn redirect_input<'b>(&'b mut self, input: &'b mut [f64]) -> Buffers<'b> {
        let output = self.output_mut();
        Buffers::out_of_place(input, output)
    }

    #[must_use]
    pub fn input(&self) -> &[f64] {
        &*self.input
    }

    pub fn input_mut(&mut self) -> &mut [f64] {
        &mut *self.input
    }

    #[must_use]
    pub fn output(&self) -> &[f64] {
        self.output.as_deref().unwrap_or(&*self.input)
    }

    pub fn output_mut(&mut self) -> &mut [f64] {
        match self.output.as_deref_mut() {
            Some(output) => output,
            None => &mut *self.input,
        }
    }

    /// Both arrays at once; the second is `None` in place.
    pub fn split_mut(&mut self) -> (&mut [f64], Option<&mut [f64]>) {
        (&mut *self.input, self.output.as_deref_mut())
    }

    #[must_use]
    pub fn load(&self, index: usize) -> f64 {
        self.input[index]
    }

    pub fn store(&mut self, index: usize, value: f64) {
        self.output_mut()[index] = value;
    }

    /// Complex element `element` of the input.
    #[must_use]
    pub fn load_c(&self, element: usize) -> (f64, f64) {
        (self.input[2 * element], self.input[2 * element + 1])
    }

    pub fn store_c(&mut self, element: usize, (re, im): (f64, f64)) {
        let output = self.output_mut();
        output[2 * element] = re;
        output[2 * element + 1] = im;
    }

    /// Complex element `element` of the output (the input when in place).
    #[must_use]
    pub fn load_output_c(&self, element: usize) -> (f64, f64) {
        let output = self.output();
        (output[2 * element], output[2 * element + 1])
    }

    /// Copy one element of `width` values from input to output.
    pub fn copy_element(&mut self, from: usize, to: usize, width: usize) {
        for c in 0..width {
            let value = self.input[from * width + c];
            self.store(to * width + c, value);
        }
    }

    /// Read one element of `width` values from the input into `dst`.
    pub fn gather(&self, from: usize, width: usize, dst: &mut [f64]) {
        dst[..width].copy_from_slice(&self.input[from * width..(from + 1) * width]);
    }

    /// Write one element of `width` values from `src` into the output.
    pub fn scatter(&mut self, to: usize, width: usize, src: &[f64]) {
        self.output_mut()[to * width..(to + 1) * width].copy_from_slice(&src[..width]);
    }
}

#[cfg(test)]
mod tests {
    use super::{Buffers, Offsets};

    #[test]
    fn out_of_place_reads_input_writes_output() {
        let mut input = vec![1.0, 2.0, 3.0, 4.0];
        let mut output = vec![0.0; 4];
        let mut io = Buffers::out_of_place(&mut input, &mut output);
        assert!(!io.is_in_place());
        let v = io.load_c(1);
        io.store_c(0, v);
        io.copy_element(0, 1, 2);
        assert_eq!(output, vec![3.0, 4.0, 1.0, 2.0]);
        assert_eq!(input, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn in_place_aliases_one_array() {
        let mut data = vec![1.0, 2.0];
        let mut io = Buffers::in_place(&mut data);
        assert!(io.is_in_place());
        io.store(0, io.load(1));
        assert_eq!(io.output(), &[2.0, 2.0]);
    }

    #[test]
    fn views_select_the_right_array() {
        let mut input = vec![1.0; 2];
        let mut output = vec![0.0; 2];
        let mut io = Buffers::out_of_place(&mut input, &mut output);
        io.output_only().store(0, 5.0);
        io.input_only().store(1, 7.0);
        let mut scratch = vec![0.0; 2];
        io.redirect_output(&mut scratch).copy_element(1, 0, 1);
        assert_eq!(scratch, vec![7.0, 0.0]);
        assert_eq!(output, vec![5.0, 0.0]);
        assert_eq!(input, vec![1.0, 7.0]);
    }

    #[test]
    fn offsets_project() {
        let at = Offsets::new(3, 5).advance(1, 2);
        assert_eq!(at, Offsets::new(4, 7));
        assert_eq!(at.on_output(), Offsets::new(7, 7));
        assert_eq!(at.on_input(), Offsets::new(4, 4));
    }
}
