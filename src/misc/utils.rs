/// Always printed, used for operator facing output such as route changes
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    {
      print!("[{}:{}] ", file!(), line!());
      println!($($arg)*)
    }
  };
}
#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => {
    if cfg!(debug_assertions) {
      print!("[{}:{}] ", file!(), line!());
      println!($($arg)*)
    }
  };
}
#[macro_export]
macro_rules! edebug {
  ($($arg:tt)*) => {
    if cfg!(debug_assertions) {
      eprint!("[{}:{}] ", file!(), line!());
      eprintln!($($arg)*)
    }
  };
}
