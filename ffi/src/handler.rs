use core::fmt::{
  self,
  Write,
};

/// Unbuffered writer straight to file descriptor 2. Formatting through it
/// never allocates.
struct Stderr;

impl Write for Stderr {
  fn write_str(&mut self, s: &str) -> fmt::Result {
    let mut rest = s.as_bytes();
    while !rest.is_empty() {
      let written = unsafe { libc::write(libc::STDERR_FILENO, rest.as_ptr().cast(), rest.len()) };
      if written <= 0 {
        return Err(fmt::Error);
      }
      rest = &rest[written as usize..];
    }
    Ok(())
  }
}

#[cfg(not(test))]
#[panic_handler]
fn panic_handler(info: &core::panic::PanicInfo) -> ! {
  _ = writeln!(Stderr, "segalloc: {info}");
  unsafe { libc::abort() }
}
