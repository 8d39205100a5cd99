// SIOCGIFCONF interface enumerator
//
// Asks the kernel for the configured interfaces with the SIOCGIFCONF ioctl
// on a throwaway datagram socket, then queries each one's flags with
// SIOCGIFFLAGS. Only interfaces with an IPv4 address are reported.

use super::{InterfaceEnumerator, InterfaceFlags, InterfaceRecord};
use crate::backends::BackendPriority;
use crate::error::{MonitorError, Result};
use nix::sys::socket::{AddressFamily, SockFlag, SockType, socket};
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

const IFNAMSIZ: usize = 16;
const BUFFER_STEP: usize = 1024;

/// Decode the interface names out of a filled SIOCGIFCONF buffer of
/// `record_len`-byte `struct ifreq` records
///
/// A trailing partial record is ignored.
pub fn decode_ifconf(buf: &[u8], record_len: usize) -> Vec<String> {
    if record_len < IFNAMSIZ {
        return Vec::new();
    }

    buf.chunks_exact(record_len)
        .filter_map(|record| {
            let name = &record[..IFNAMSIZ];
            let end = name.iter().position(|&b| b == 0).unwrap_or(IFNAMSIZ);
            (end > 0).then(|| String::from_utf8_lossy(&name[..end]).into_owned())
        })
        .collect()
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
union IfReqData {
    flags: libc::c_short,
    addr: libc::sockaddr,
    map: [libc::c_ulong; 3],
}

/// Mirror of the kernel's `struct ifreq`
#[repr(C)]
struct IfReq {
    name: [libc::c_char; IFNAMSIZ],
    data: IfReqData,
}

const IFREQ_LEN: usize = std::mem::size_of::<IfReq>();

mod ioctl {
    use super::{IfConf, IfReq};

    nix::ioctl_readwrite_bad!(siocgifconf, libc::SIOCGIFCONF, IfConf);
    nix::ioctl_readwrite_bad!(siocgifflags, libc::SIOCGIFFLAGS, IfReq);
}

#[repr(C)]
struct IfConf {
    len: libc::c_int,
    buf: *mut libc::c_char,
}

fn enumeration_failed(source: io::Error) -> MonitorError {
    MonitorError::EnumerationFailed {
        backend: "ifconf",
        source,
    }
}

fn control_socket() -> io::Result<OwnedFd> {
    socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::empty(),
        None,
    )
    .map_err(io::Error::from)
}

fn interface_names(fd: RawFd) -> io::Result<Vec<String>> {
    let mut capacity = BUFFER_STEP;
    loop {
        let mut buf = vec![0u8; capacity];
        let mut conf = IfConf {
            len: capacity as libc::c_int,
            buf: buf.as_mut_ptr().cast(),
        };

        // SAFETY: conf points at buf, which is conf.len bytes long
        unsafe { ioctl::siocgifconf(fd, &mut conf) }.map_err(io::Error::from)?;

        // Some kernels report the size they needed, others the size they
        // copied; with less than one record of slack we may have lost some
        let used = conf.len.max(0) as usize;
        if used + IFREQ_LEN > capacity {
            capacity += BUFFER_STEP;
            log::trace!("SIOCGIFCONF buffer full, retrying with {} bytes", capacity);
            continue;
        }

        return Ok(decode_ifconf(&buf[..used], IFREQ_LEN));
    }
}

fn interface_flags(fd: RawFd, name: &str) -> Option<InterfaceFlags> {
    let bytes = name.as_bytes();
    if bytes.len() >= IFNAMSIZ {
        return None;
    }

    let mut req = IfReq {
        name: [0; IFNAMSIZ],
        data: IfReqData { map: [0; 3] },
    };
    for (dst, &src) in req.name.iter_mut().zip(bytes) {
        *dst = src as libc::c_char;
    }

    // SAFETY: req is a NUL-terminated ifreq the kernel fills in
    unsafe { ioctl::siocgifflags(fd, &mut req) }.ok()?;

    // SAFETY: SIOCGIFFLAGS stores the flags member
    let flags = unsafe { req.data.flags } as libc::c_int;
    Some(InterfaceFlags {
        up: flags & libc::IFF_UP != 0,
        loopback: flags & libc::IFF_LOOPBACK != 0,
    })
}

pub struct IfconfEnumerator;

impl IfconfEnumerator {
    pub fn new() -> Self {
        Self
    }
}

impl InterfaceEnumerator for IfconfEnumerator {
    fn name(&self) -> &'static str {
        "ifconf"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Best
    }

    fn is_available() -> bool {
        control_socket().is_ok()
    }

    fn list(&self) -> Result<Vec<InterfaceRecord>> {
        let socket = control_socket().map_err(enumeration_failed)?;
        let fd = socket.as_raw_fd();

        let names = interface_names(fd).map_err(enumeration_failed)?;
        Ok(names
            .into_iter()
            .map(|name| {
                let flags = interface_flags(fd, &name);
                InterfaceRecord::new(name, flags)
            })
            .collect())
    }

    fn flags_of(&self, name: &str) -> Option<InterfaceFlags> {
        let socket = control_socket().ok()?;
        interface_flags(socket.as_raw_fd(), name)
    }
}
