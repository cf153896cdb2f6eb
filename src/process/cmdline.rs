//! Command string reconstruction from a process argument vector.
//!
//! Like NetBSD's top(1), falls back to the kernel short name when the full
//! command cannot be built.

use tracing::debug;

/// Builds the display command and the byte offset where the executable
/// name ends.
///
/// Arguments are joined with single spaces. When `argv` is unavailable,
/// empty, or joins to an empty string, or when the buffer cannot be
/// allocated, `fallback` is returned with its full length as the offset.
pub fn reconstruct_command(argv: Option<&[String]>, fallback: &str) -> (String, usize) {
    let args = match argv {
        Some(a) if !a.is_empty() => a,
        _ => return fallback_command(fallback),
    };

    let len = args
        .iter()
        .fold(0usize, |acc, a| acc.saturating_add(a.len()).saturating_add(1))
        - 1;

    // huge argument vectors must not abort the sampler
    let mut command = String::new();
    if let Err(e) = command.try_reserve_exact(len) {
        debug!("Cannot allocate {} bytes for command of {}: {}", len, fallback, e);
        return fallback_command(fallback);
    }

    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            command.push(' ');
        }
        command.push_str(arg);
    }

    if command.is_empty() {
        return fallback_command(fallback);
    }

    let basename_offset = args[0].len().min(command.len());
    (command, basename_offset)
}

fn fallback_command(fallback: &str) -> (String, usize) {
    (fallback.to_string(), fallback.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reconstruct_joins_arguments() {
        let args = argv(&["/bin/sh", "-c", "ls"]);
        let (command, offset) = reconstruct_command(Some(args.as_slice()), "sh");
        assert_eq!(command.trim_end(), "/bin/sh -c ls");
        assert_eq!(offset, 7);
        assert_eq!(&command[..offset], "/bin/sh");
    }

    #[test]
    fn test_reconstruct_unavailable_uses_fallback() {
        let (command, offset) = reconstruct_command(None, "sh");
        assert_eq!(command, "sh");
        assert_eq!(offset, 2);
    }

    #[test]
    fn test_reconstruct_empty_vector_uses_fallback() {
        let (command, offset) = reconstruct_command(Some(&[] as &[String]), "kworker/0:1");
        assert_eq!(command, "kworker/0:1");
        assert_eq!(offset, 11);
    }

    #[test]
    fn test_reconstruct_empty_arguments_use_fallback() {
        let args = argv(&[""]);
        let (command, offset) = reconstruct_command(Some(args.as_slice()), "init");
        assert_eq!(command, "init");
        assert_eq!(offset, 4);
    }

    #[test]
    fn test_reconstruct_single_argument() {
        let args = argv(&["/usr/sbin/sshd"]);
        let (command, offset) = reconstruct_command(Some(args.as_slice()), "sshd");
        assert_eq!(command, "/usr/sbin/sshd");
        assert_eq!(offset, command.len());
    }

    #[test]
    fn test_reconstruct_empty_first_argument() {
        let args = argv(&["", "--flag"]);
        let (command, offset) = reconstruct_command(Some(args.as_slice()), "daemon");
        assert_eq!(command, " --flag");
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_reconstruct_multibyte_offset_on_char_boundary() {
        let args = argv(&["/opt/prögram", "ä"]);
        let (command, offset) = reconstruct_command(Some(args.as_slice()), "prögram");
        assert!(command.is_char_boundary(offset));
        assert_eq!(&command[..offset], "/opt/prögram");
    }

    #[test]
    fn test_reconstruct_large_vector() {
        let args: Vec<String> = (0..10_000).map(|i| format!("arg{}", i)).collect();
        let (command, offset) = reconstruct_command(Some(args.as_slice()), "big");
        assert!(command.starts_with("arg0 arg1 "));
        assert!(command.ends_with("arg9999"));
        assert_eq!(offset, 4);
    }
}
