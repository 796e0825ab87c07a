#![allow(unsafe_code)]

use core::time::Duration;
use std::os::unix::io::RawFd;
use std::{io, mem, ptr};

mod imp {
    pub const IFF_TUN: libc::c_int = 0x0001;
    pub const IFF_TAP: libc::c_int = 0x0002;
    pub const IFF_NO_PI: libc::c_int = 0x1000;

    pub const SIOCGIFMTU: libc::c_ulong = 0x8921;

    pub const TUNSETIFF: libc::c_ulong = if cfg!(any(
        target_arch = "mips",
        target_arch = "mips64",
        target_arch = "powerpc",
        target_arch = "powerpc64",
        target_arch = "sparc64"
    )) {
        0x800454CA
    } else {
        0x400454CA
    };
}

pub mod tuntap_interface;

pub use self::tuntap_interface::TunTapInterfaceDesc;

/// Wait until any of the given file descriptors becomes readable, but no longer
/// than given timeout.
pub fn wait(fds: &[RawFd], duration: Option<Duration>) -> io::Result<()> {
    unsafe {
        let mut readfds = {
            let mut readfds = mem::MaybeUninit::<libc::fd_set>::uninit();
            libc::FD_ZERO(readfds.as_mut_ptr());
            for &fd in fds {
                libc::FD_SET(fd, readfds.as_mut_ptr());
            }
            readfds.assume_init()
        };
        let nfds = fds.iter().copied().max().map_or(0, |fd| fd + 1);

        let mut timeout = libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        let timeout_ptr = if let Some(duration) = duration {
            timeout.tv_sec = duration.as_secs() as libc::time_t;
            timeout.tv_usec = duration.subsec_micros() as libc::suseconds_t;
            &mut timeout as *mut _
        } else {
            ptr::null_mut()
        };

        let res = libc::select(
            nfds,
            &mut readfds,
            ptr::null_mut(),
            ptr::null_mut(),
            timeout_ptr,
        );
        if res == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[repr(C)]
#[derive(Debug)]
struct InterfaceRequest {
    ifr_name: [libc::c_char; libc::IF_NAMESIZE],
    ifr_data: libc::c_int, /* ifr_ifindex or ifr_mtu */
}

fn ifreq_for(name: &str) -> io::Result<InterfaceRequest> {
    let mut ifreq = InterfaceRequest {
        ifr_name: [0; libc::IF_NAMESIZE],
        ifr_data: 0,
    };
    // Leave room for the terminating NUL.
    if name.len() >= libc::IF_NAMESIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "interface name too long",
        ));
    }
    for (i, byte) in name.as_bytes().iter().enumerate() {
        ifreq.ifr_name[i] = *byte as libc::c_char
    }
    Ok(ifreq)
}

fn ifreq_ioctl(
    lower: libc::c_int,
    ifreq: &mut InterfaceRequest,
    cmd: libc::c_ulong,
) -> io::Result<libc::c_int> {
    unsafe {
        let res = libc::ioctl(lower, cmd as _, ifreq as *mut InterfaceRequest);
        if res == -1 {
            return Err(io::Error::last_os_error());
        }
    }

    Ok(ifreq.ifr_data)
}
