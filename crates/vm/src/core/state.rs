//! Account state as seen by an execution.
//!
//! [`StateDb`] is the seam between the interpreter and whatever backs account state.
//! [`InMemoryState`] is a hashbrown-backed implementation with an undo journal, which is enough
//! to run nested frames with correct revert semantics.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use hashbrown::HashMap;

use super::{log::Log, storage::Storage};
use crate::error::{Error, Result};

/// A position in the state journal. Reverting to it undoes every change made after it was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// The checkpoint taken before any change was journaled.
    pub const ORIGIN: Checkpoint = Checkpoint(0);
}

/// The state collaborator an execution reads and mutates.
pub trait StateDb {
    /// Returns true if the account exists.
    fn exists(&self, address: Address) -> bool;

    /// Creates `address` as a fresh account, keeping any balance it already holds.
    fn create_account(&mut self, address: Address);

    /// Returns the balance of `address`.
    fn balance(&self, address: Address) -> U256;

    /// Credits `amount` to `address`, creating the account if needed.
    fn add_balance(&mut self, address: Address, amount: U256);

    /// Debits `amount` from `address`. Fails without side effects if the balance is too low.
    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<()>;

    /// Returns the nonce of `address`.
    fn nonce(&self, address: Address) -> u64;

    /// Sets the nonce of `address`.
    fn set_nonce(&mut self, address: Address, nonce: u64);

    /// Returns the code deployed at `address`.
    fn code(&self, address: Address) -> Bytes;

    /// Deploys `code` at `address`.
    fn set_code(&mut self, address: Address, code: Bytes);

    /// Reads a persistent storage slot.
    fn storage(&self, address: Address, key: U256) -> U256;

    /// Writes a persistent storage slot.
    fn set_storage(&mut self, address: Address, key: U256, value: U256);

    /// Reads a transient storage slot.
    fn transient_storage(&self, address: Address, key: U256) -> U256;

    /// Writes a transient storage slot.
    fn set_transient_storage(&mut self, address: Address, key: U256, value: U256);

    /// Records a log.
    fn add_log(&mut self, log: Log);

    /// Returns every log recorded and not reverted.
    fn logs(&self) -> &[Log];

    /// Takes a checkpoint of the current state.
    fn checkpoint(&mut self) -> Checkpoint;

    /// Undoes every change made since `checkpoint`.
    fn revert_to(&mut self, checkpoint: Checkpoint);

    /// Accepts the changes made since `checkpoint`. They are still undone if an enclosing
    /// checkpoint is reverted.
    fn commit(&mut self, _checkpoint: Checkpoint) {}

    /// Ends the current transaction. Every change so far becomes final, so earlier checkpoints
    /// can no longer be reverted to, and transient storage is cleared.
    fn finalize(&mut self);

    /// Returns the keccak hash of the code at `address`, or zero for accounts that do not exist.
    fn code_hash(&self, address: Address) -> B256 {
        if !self.exists(address) {
            return B256::ZERO;
        }
        keccak256(self.code(address))
    }

    /// Returns true if `address` can cover `amount`.
    fn can_transfer(&self, address: Address, amount: U256) -> bool {
        self.balance(address) >= amount
    }

    /// Moves `amount` from `from` to `to` as a single step. Nothing moves if `from` cannot cover
    /// it.
    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        if !self.can_transfer(from, amount) {
            return Err(Error::InsufficientBalance);
        }
        self.sub_balance(from, amount)?;
        self.add_balance(to, amount);
        Ok(())
    }
}

/// An account in the in-memory state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Balance in wei
    pub balance: U256,
    /// Number of transactions sent or contracts created
    pub nonce: u64,
    /// Deployed code
    pub code: Bytes,
    /// Persistent storage
    pub storage: Storage,
}

impl Account {
    /// An account holding `balance` and nothing else.
    pub fn with_balance(balance: U256) -> Self {
        Account { balance, ..Default::default() }
    }

    /// A contract account with `code` deployed.
    pub fn with_code(code: Bytes) -> Self {
        Account { code, ..Default::default() }
    }
}

#[derive(Clone, Debug)]
enum JournalEntry {
    AccountCreated { address: Address },
    AccountReset { address: Address, previous: Box<Account> },
    BalanceChanged { address: Address, previous: U256 },
    NonceChanged { address: Address, previous: u64 },
    CodeChanged { address: Address, previous: Bytes },
    StorageChanged { address: Address, key: U256, previous: U256 },
    TransientStorageChanged { address: Address, key: U256, previous: U256 },
    LogAdded,
}

/// A [`StateDb`] that keeps every account in memory.
///
/// ```
/// use alloy::primitives::{Address, U256};
/// use sleipnir_vm::core::state::{Account, InMemoryState, StateDb};
///
/// let alice = Address::repeat_byte(0xa1);
/// let mut state = InMemoryState::new();
/// state.insert_account(alice, Account::with_balance(U256::from(10)));
///
/// let checkpoint = state.checkpoint();
/// state.set_nonce(alice, 7);
/// state.revert_to(checkpoint);
///
/// assert_eq!(state.nonce(alice), 0);
/// assert_eq!(state.balance(alice), U256::from(10));
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryState {
    accounts: HashMap<Address, Account>,
    transient: HashMap<(Address, U256), U256>,
    logs: Vec<Log>,
    journal: Vec<JournalEntry>,
}

impl InMemoryState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `account` at `address` outside of the journal, replacing whatever was there.
    /// Meant for setting up genesis-like state before an execution.
    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Returns the account at `address`, if it exists.
    pub fn account(&self, address: Address) -> Option<&Account> {
        self.accounts.get(&address)
    }

    /// Iterates over every account in arbitrary order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    fn account_mut(&mut self, address: Address) -> &mut Account {
        if !self.accounts.contains_key(&address) {
            self.journal.push(JournalEntry::AccountCreated { address });
        }
        self.accounts.entry(address).or_default()
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::AccountCreated { address } => {
                self.accounts.remove(&address);
            }
            JournalEntry::AccountReset { address, previous } => {
                self.accounts.insert(address, *previous);
            }
            JournalEntry::BalanceChanged { address, previous } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.balance = previous;
                }
            }
            JournalEntry::NonceChanged { address, previous } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.nonce = previous;
                }
            }
            JournalEntry::CodeChanged { address, previous } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.code = previous;
                }
            }
            JournalEntry::StorageChanged { address, key, previous } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.storage.store(key, previous);
                }
            }
            JournalEntry::TransientStorageChanged { address, key, previous } => {
                if previous.is_zero() {
                    self.transient.remove(&(address, key));
                } else {
                    self.transient.insert((address, key), previous);
                }
            }
            JournalEntry::LogAdded => {
                self.logs.pop();
            }
        }
    }
}

impl StateDb for InMemoryState {
    fn exists(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    fn create_account(&mut self, address: Address) {
        match self.accounts.get(&address) {
            Some(existing) => {
                let previous = Box::new(existing.clone());
                let balance = existing.balance;
                self.journal.push(JournalEntry::AccountReset { address, previous });
                self.accounts.insert(address, Account::with_balance(balance));
            }
            None => {
                self.account_mut(address);
            }
        }
    }

    fn balance(&self, address: Address) -> U256 {
        self.accounts.get(&address).map(|a| a.balance).unwrap_or_default()
    }

    fn add_balance(&mut self, address: Address, amount: U256) {
        let account = self.account_mut(address);
        let previous = account.balance;
        account.balance = previous.saturating_add(amount);
        self.journal.push(JournalEntry::BalanceChanged { address, previous });
    }

    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let account = self.accounts.get_mut(&address).ok_or(Error::InsufficientBalance)?;
        let previous = account.balance;
        account.balance = previous.checked_sub(amount).ok_or(Error::InsufficientBalance)?;
        self.journal.push(JournalEntry::BalanceChanged { address, previous });
        Ok(())
    }

    fn nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map(|a| a.nonce).unwrap_or_default()
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) {
        let account = self.account_mut(address);
        let previous = std::mem::replace(&mut account.nonce, nonce);
        self.journal.push(JournalEntry::NonceChanged { address, previous });
    }

    fn code(&self, address: Address) -> Bytes {
        self.accounts.get(&address).map(|a| a.code.clone()).unwrap_or_default()
    }

    fn set_code(&mut self, address: Address, code: Bytes) {
        let account = self.account_mut(address);
        let previous = std::mem::replace(&mut account.code, code);
        self.journal.push(JournalEntry::CodeChanged { address, previous });
    }

    fn storage(&self, address: Address, key: U256) -> U256 {
        self.accounts.get(&address).map(|a| a.storage.load(key)).unwrap_or_default()
    }

    fn set_storage(&mut self, address: Address, key: U256, value: U256) {
        let account = self.account_mut(address);
        let previous = account.storage.store(key, value);
        self.journal.push(JournalEntry::StorageChanged { address, key, previous });
    }

    fn transient_storage(&self, address: Address, key: U256) -> U256 {
        self.transient.get(&(address, key)).copied().unwrap_or_default()
    }

    fn set_transient_storage(&mut self, address: Address, key: U256, value: U256) {
        let previous = if value.is_zero() {
            self.transient.remove(&(address, key))
        } else {
            self.transient.insert((address, key), value)
        };
        self.journal.push(JournalEntry::TransientStorageChanged {
            address,
            key,
            previous: previous.unwrap_or_default(),
        });
    }

    fn add_log(&mut self, log: Log) {
        self.logs.push(log);
        self.journal.push(JournalEntry::LogAdded);
    }

    fn logs(&self) -> &[Log] {
        &self.logs
    }

    fn checkpoint(&mut self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    fn commit(&mut self, checkpoint: Checkpoint) {
        // nothing encloses the outermost checkpoint, so its undo entries are never needed
        if checkpoint == Checkpoint::ORIGIN {
            self.journal.clear();
        }
    }

    fn finalize(&mut self) {
        self.transient.clear();
        self.journal.clear();
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        if checkpoint.0 >= self.journal.len() {
            return;
        }
        let entries = self.journal.split_off(checkpoint.0);
        entries.into_iter().rev().for_each(|entry| self.undo(entry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);

    fn funded_state() -> InMemoryState {
        let mut state = InMemoryState::new();
        state.insert_account(ALICE, Account::with_balance(U256::from(100)));
        state
    }

    #[test]
    fn test_transfer() {
        let mut state = funded_state();
        state.transfer(ALICE, BOB, U256::from(40)).expect("transfer failed");
        assert_eq!(state.balance(ALICE), U256::from(60));
        assert_eq!(state.balance(BOB), U256::from(40));
        assert!(state.exists(BOB));
    }

    #[test]
    fn test_transfer_insufficient_balance_moves_nothing() {
        let mut state = funded_state();
        assert_eq!(state.transfer(ALICE, BOB, U256::from(101)), Err(Error::InsufficientBalance));
        assert_eq!(state.balance(ALICE), U256::from(100));
        assert!(!state.exists(BOB));
    }

    #[test]
    fn test_revert_restores_everything() {
        let mut state = funded_state();
        let checkpoint = state.checkpoint();

        state.transfer(ALICE, BOB, U256::from(1)).expect("transfer failed");
        state.set_storage(ALICE, U256::from(1), U256::from(2));
        state.set_transient_storage(ALICE, U256::from(3), U256::from(4));
        state.set_code(BOB, Bytes::from_static(&[0x00]));
        state.set_nonce(ALICE, 9);
        state.add_log(Log::new(ALICE, vec![], Bytes::new()));

        state.revert_to(checkpoint);

        assert_eq!(state.balance(ALICE), U256::from(100));
        assert_eq!(state.storage(ALICE, U256::from(1)), U256::ZERO);
        assert_eq!(state.transient_storage(ALICE, U256::from(3)), U256::ZERO);
        assert_eq!(state.nonce(ALICE), 0);
        assert!(!state.exists(BOB));
        assert!(state.logs().is_empty());
    }

    #[test]
    fn test_nested_checkpoints() {
        let mut state = funded_state();
        let outer = state.checkpoint();
        state.set_storage(ALICE, U256::from(1), U256::from(1));

        let inner = state.checkpoint();
        state.set_storage(ALICE, U256::from(1), U256::from(2));
        state.revert_to(inner);
        assert_eq!(state.storage(ALICE, U256::from(1)), U256::from(1));

        let inner = state.checkpoint();
        state.set_storage(ALICE, U256::from(2), U256::from(2));
        state.commit(inner);
        state.revert_to(outer);
        assert_eq!(state.storage(ALICE, U256::from(1)), U256::ZERO);
        assert_eq!(state.storage(ALICE, U256::from(2)), U256::ZERO);
    }

    #[test]
    fn test_outermost_commit_discards_journal() {
        let mut state = funded_state();
        let outer = state.checkpoint();
        assert_eq!(outer, Checkpoint::ORIGIN);

        state.set_storage(ALICE, U256::from(1), U256::from(1));
        let inner = state.checkpoint();
        state.set_storage(ALICE, U256::from(2), U256::from(2));
        state.commit(inner);
        assert_eq!(state.checkpoint(), Checkpoint(2));

        state.commit(outer);
        assert_eq!(state.checkpoint(), Checkpoint::ORIGIN);
        assert_eq!(state.storage(ALICE, U256::from(2)), U256::from(2));
    }

    #[test]
    fn test_finalize_clears_transient_storage() {
        let mut state = funded_state();
        state.set_transient_storage(ALICE, U256::from(1), U256::from(7));
        state.set_storage(ALICE, U256::from(1), U256::from(7));

        state.finalize();

        assert_eq!(state.transient_storage(ALICE, U256::from(1)), U256::ZERO);
        assert_eq!(state.storage(ALICE, U256::from(1)), U256::from(7));
        assert_eq!(state.checkpoint(), Checkpoint::ORIGIN);

        // nothing left to undo
        state.revert_to(Checkpoint::ORIGIN);
        assert_eq!(state.storage(ALICE, U256::from(1)), U256::from(7));
    }

    #[test]
    fn test_create_account_keeps_balance() {
        let mut state = funded_state();
        state.set_storage(ALICE, U256::from(1), U256::from(1));

        let checkpoint = state.checkpoint();
        state.create_account(ALICE);
        assert_eq!(state.balance(ALICE), U256::from(100));
        assert_eq!(state.storage(ALICE, U256::from(1)), U256::ZERO);

        state.revert_to(checkpoint);
        assert_eq!(state.storage(ALICE, U256::from(1)), U256::from(1));
    }

    #[test]
    fn test_code_hash() {
        let mut state = funded_state();
        assert_eq!(state.code_hash(BOB), B256::ZERO);
        assert_eq!(state.code_hash(ALICE), keccak256([]));
    }
}
