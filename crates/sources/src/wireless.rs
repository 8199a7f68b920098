//! Wireless extensions: SSID through `SIOCGIWESSID`, link quality through
//! `/proc/net/wireless`

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::Path;

use crate::format::percent;

/// Link quality reported for a full-strength signal
const MAX_LINK_QUALITY: f64 = 70.0;

const SIOCGIWESSID: u32 = 0x8B1B;
const IW_ESSID_MAX_SIZE: usize = 32;

/// `struct iw_point` from `linux/wireless.h`
#[repr(C)]
#[derive(Clone, Copy)]
struct IwPoint {
    pointer: *mut libc::c_void,
    length: u16,
    flags: u16,
}

/// `union iwreq_data`; the raw member pins its size to that of `sockaddr`
#[repr(C)]
union IwReqData {
    essid: IwPoint,
    _raw: [u8; 16],
}

/// `struct iwreq`
#[repr(C)]
struct IwReq {
    name: [libc::c_char; libc::IFNAMSIZ],
    data: IwReqData,
}

/// Network name the interface is associated with
pub fn ssid(interface: &str) -> Result<String> {
    let name = interface.as_bytes();
    if name.is_empty() || name.len() >= libc::IFNAMSIZ || name.contains(&0) {
        return Err(anyhow!("Invalid interface name {:?}", interface));
    }

    // One extra byte keeps the name NUL-terminated
    let mut essid = [0u8; IW_ESSID_MAX_SIZE + 1];
    let mut request = IwReq {
        name: [0; libc::IFNAMSIZ],
        data: IwReqData {
            essid: IwPoint {
                pointer: essid.as_mut_ptr().cast(),
                length: essid.len() as u16,
                flags: 0,
            },
        },
    };
    for (dst, &src) in request.name.iter_mut().zip(name) {
        *dst = src as libc::c_char;
    }

    // SAFETY: socket() has no preconditions; ownership moves into OwnedFd
    // right away so the descriptor is closed on every path.
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error()).context("Failed to open wireless socket");
    }
    let socket = unsafe { OwnedFd::from_raw_fd(fd) };

    // SAFETY: `request` is a valid iwreq whose essid buffer outlives the call
    // and is as long as advertised.
    let result = unsafe {
        libc::ioctl(
            socket.as_raw_fd(),
            SIOCGIWESSID as _,
            &mut request as *mut IwReq,
        )
    };
    if result < 0 {
        return Err(io::Error::last_os_error())
            .with_context(|| format!("{} has no wireless extensions", interface));
    }

    let len = essid.iter().position(|&b| b == 0).unwrap_or(essid.len());
    Ok(String::from_utf8_lossy(&essid[..len]).into_owned())
}

/// Link quality column of `interface` in `/proc/net/wireless` contents
fn link_quality(contents: &str, interface: &str) -> Option<f64> {
    // Two header lines precede the interfaces
    contents.lines().skip(2).find_map(|line| {
        let (name, rest) = line.trim_start().split_once(':')?;
        if name != interface {
            return None;
        }
        // status, link, level, noise, ...
        let link = rest.split_whitespace().nth(1)?;
        link.trim_end_matches('.').parse().ok()
    })
}

/// Signal strength as a percent of a full-strength link
pub fn signal_strength(wireless_stats: &Path, interface: &str) -> Result<String> {
    let contents = fs::read_to_string(wireless_stats)
        .with_context(|| format!("Failed to read {}", wireless_stats.display()))?;
    let quality = link_quality(&contents, interface)
        .ok_or_else(|| anyhow!("{} is not listed in {}", interface, wireless_stats.display()))?;
    percent(quality, MAX_LINK_QUALITY).ok_or_else(|| anyhow!("Invalid link quality"))
}
