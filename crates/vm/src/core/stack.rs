use std::{collections::VecDeque, fmt::Display};

use alloy::primitives::U256;
use sleipnir_common::utils::strings::encode_hex_reduced;

use crate::error::{Error, Result};

/// The maximum number of words a frame's stack may hold.
pub const STACK_LIMIT: usize = 1024;

/// The [`Stack`] struct represents the operand stack of a single frame.
/// The front of the deque is the top of the stack.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Stack {
    /// The stack items in LIFO order
    pub stack: VecDeque<U256>,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    /// Creates a new, empty [`Stack`].
    ///
    /// ```
    /// use sleipnir_vm::core::stack::Stack;
    ///
    /// let stack = Stack::new();
    /// assert_eq!(stack.size(), 0);
    /// ```
    pub fn new() -> Stack {
        Stack { stack: VecDeque::with_capacity(64) }
    }

    /// Push a value onto the stack. Fails with [`Error::StackOverflow`] once the stack holds
    /// [`STACK_LIMIT`] items.
    ///
    /// ```
    /// use sleipnir_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x00)).expect("stack overflow");
    /// assert_eq!(stack.size(), 1);
    /// ```
    pub fn push(&mut self, value: U256) -> Result<()> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(Error::StackOverflow);
        }
        self.stack.push_front(value);
        Ok(())
    }

    /// Pop a value off the stack.
    pub fn pop(&mut self) -> Result<U256> {
        self.stack.pop_front().ok_or(Error::StackUnderflow)
    }

    /// Pop n values off the stack, topmost first.
    ///
    /// ```
    /// use sleipnir_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// for i in 0..3u8 {
    ///     stack.push(U256::from(i)).expect("stack overflow");
    /// }
    ///
    /// // stack is now [0x02, 0x01, 0x00]
    /// let values = stack.pop_n(2).expect("stack underflow");
    /// assert_eq!(values, vec![U256::from(2), U256::from(1)]);
    /// assert!(stack.pop_n(2).is_err());
    /// ```
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<U256>> {
        if self.stack.len() < n {
            return Err(Error::StackUnderflow);
        }
        Ok(self.stack.drain(0..n).collect())
    }

    /// Swap the top value and the nth value on the stack.
    pub fn swap(&mut self, n: usize) -> Result<()> {
        if n >= self.stack.len() {
            return Err(Error::StackUnderflow);
        }
        self.stack.swap(0, n);
        Ok(())
    }

    /// Duplicate the nth value on the stack (1 being the top).
    pub fn dup(&mut self, n: usize) -> Result<()> {
        let value = n
            .checked_sub(1)
            .and_then(|index| self.stack.get(index))
            .copied()
            .ok_or(Error::StackUnderflow)?;
        self.push(value)
    }

    /// Peek at the value `index` items below the top, if there is one.
    pub fn peek(&self, index: usize) -> Option<U256> {
        self.stack.get(index).copied()
    }

    /// Get the size of the stack
    pub fn size(&self) -> usize {
        self.stack.len()
    }

    /// Check if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items = self.stack.iter().map(|value| encode_hex_reduced(*value)).collect::<Vec<_>>();
        write!(f, "[{}]", items.join(", "))
    }
}
