//! Recording fakes for the hardware traits.

use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::os::fd::BorrowedFd;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::hw_trait::gpio::{Direction, GpioSysfs, ValueFile};
use crate::hw_trait::i2c::I2cBus;

/// A successful sysfs operation, as seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysfsOp {
    Write(PathBuf, String),
    Open(PathBuf, Direction),
}

struct SysfsState {
    root: PathBuf,
    existing: HashSet<PathBuf>,
    failing: HashSet<PathBuf>,
    fail_open: bool,
    direction_files: bool,
    ops: Vec<SysfsOp>,
    value: u8,
    short_io: bool,
    value_io: usize,
}

impl SysfsState {
    fn pin_files(&self, pin: u32) -> Vec<PathBuf> {
        let dir = self.root.join(format!("gpio{}", pin));
        let mut files = vec![dir.join("value"), dir.join("edge")];
        if self.direction_files {
            files.push(dir.join("direction"));
        }
        files
    }
}

/// In-memory GPIO sysfs tree that behaves like the kernel's: writing a pin
/// number to `export` creates the pin's files and `unexport` removes them.
///
/// Clones share state, so a test can hand one to a controller and inspect
/// the other.
#[derive(Clone)]
pub struct FakeSysfs(Rc<RefCell<SysfsState>>);

impl FakeSysfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let existing = [root.join("export"), root.join("unexport")].into();
        Self(Rc::new(RefCell::new(SysfsState {
            root,
            existing,
            failing: HashSet::new(),
            fail_open: false,
            direction_files: true,
            ops: Vec::new(),
            value: b'0',
            short_io: false,
            value_io: 0,
        })))
    }

    /// Pretend someone else already exported `pin`.
    pub fn with_exported(self, pin: u32) -> Self {
        {
            let mut state = self.0.borrow_mut();
            let files = state.pin_files(pin);
            state.existing.extend(files);
        }
        self
    }

    /// Pins come without a direction file.
    pub fn without_direction(self) -> Self {
        self.0.borrow_mut().direction_files = false;
        self
    }

    pub fn fail_writes_to(self, path: PathBuf) -> Self {
        self.0.borrow_mut().failing.insert(path);
        self
    }

    pub fn fail_open(self) -> Self {
        self.0.borrow_mut().fail_open = true;
        self
    }

    pub fn ops(&self) -> Vec<SysfsOp> {
        self.0.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.0.borrow_mut().ops.clear();
    }

    /// Current content of the value file.
    pub fn value(&self) -> u8 {
        self.0.borrow().value
    }

    pub fn set_value(&self, value: u8) {
        self.0.borrow_mut().value = value;
    }

    /// Make value file reads and writes transfer nothing.
    pub fn set_short_io(&self, short: bool) {
        self.0.borrow_mut().short_io = short;
    }

    /// Number of reads and writes issued on value files.
    pub fn value_io(&self) -> usize {
        self.0.borrow().value_io
    }
}

impl GpioSysfs for FakeSysfs {
    type Value = FakeValue;

    fn exists(&self, path: &Path) -> bool {
        self.0.borrow().existing.contains(path)
    }

    fn write_attr(&mut self, path: &Path, value: &str) -> io::Result<()> {
        let mut state = self.0.borrow_mut();
        if state.failing.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        if !state.existing.contains(path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        state.ops.push(SysfsOp::Write(path.to_path_buf(), value.to_owned()));

        if let Ok(pin) = value.parse::<u32>() {
            let files = state.pin_files(pin);
            if path == state.root.join("export") {
                state.existing.extend(files);
            } else if path == state.root.join("unexport") {
                for file in files {
                    state.existing.remove(&file);
                }
            }
        }
        Ok(())
    }

    fn open_value(&mut self, path: &Path, direction: Direction) -> io::Result<FakeValue> {
        let mut state = self.0.borrow_mut();
        if state.fail_open || !state.existing.contains(path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        state.ops.push(SysfsOp::Open(path.to_path_buf(), direction));
        Ok(FakeValue(self.0.clone()))
    }
}

pub struct FakeValue(Rc<RefCell<SysfsState>>);

impl ValueFile for FakeValue {
    fn read_at(&self, buf: &mut [u8], _offset: u64) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        state.value_io += 1;
        if state.short_io || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = state.value;
        Ok(1)
    }

    fn write_at(&self, buf: &[u8], _offset: u64) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        state.value_io += 1;
        if state.short_io || buf.is_empty() {
            return Ok(0);
        }
        state.value = buf[0];
        Ok(1)
    }

    fn poll_fd(&self) -> Option<BorrowedFd<'_>> {
        None
    }
}

#[derive(Default)]
struct BusState {
    written: Vec<Vec<u8>>,
    read_data: Vec<u8>,
    limit: Option<usize>,
    fail: bool,
    reads: usize,
}

/// I2C bus that records writes and serves reads from a canned buffer.
#[derive(Clone, Default)]
pub struct FakeBus(Rc<RefCell<BusState>>);

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data returned by subsequent reads.
    pub fn set_read_data(&self, data: &[u8]) {
        self.0.borrow_mut().read_data = data.to_vec();
    }

    /// Cap every transfer at `limit` bytes.
    pub fn limit_transfers(&self, limit: usize) {
        self.0.borrow_mut().limit = Some(limit);
    }

    /// Make every transfer fail outright.
    pub fn fail_transfers(&self) {
        self.0.borrow_mut().fail = true;
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.0.borrow().written.clone()
    }

    /// Number of read syscalls issued.
    pub fn reads(&self) -> usize {
        self.0.borrow().reads
    }
}

impl I2cBus for FakeBus {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        if state.fail {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        let n = state.limit.map_or(data.len(), |limit| limit.min(data.len()));
        state.written.push(data[..n].to_vec());
        Ok(n)
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        state.reads += 1;
        if state.fail {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        let available = state.read_data.len().min(buffer.len());
        let n = state.limit.map_or(available, |limit| limit.min(available));
        buffer[..n].copy_from_slice(&state.read_data[..n]);
        Ok(n)
    }
}
