/// [`Control`] tells the execution loop whether the frame keeps running after an instruction. It
/// is returned by the [`VM::step`](super::VM::step) function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// Continue with the next instruction.
    Continue,

    /// The frame halted successfully, via `STOP`, `RETURN`, `SELFDESTRUCT` or by running past the
    /// end of its code.
    Halt,
}
