cfg_if::cfg_if! {
    if #[cfg(all(feature = "use-syscall", any(target_os = "linux", target_os = "android")))]{
        pub(crate) mod linux_syscall;
        pub use linux_syscall::*;
        /// The provider used by the global registry on this target.
        pub type DefaultProvider = SyscallProvider;
    }else {
        pub(crate) mod unix;
        pub use unix::*;
        /// The provider used by the global registry on this target.
        pub type DefaultProvider = LibcProvider;
    }
}
