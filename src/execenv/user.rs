// src/execenv/user.rs

//! Current OS user lookup for the `user.*` namespace.

use std::ffi::CStr;

use anyhow::{anyhow, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: String,
    pub group: String,
}

/// Look up the user running this process in the passwd/group databases.
#[cfg(unix)]
pub fn current_user() -> Result<UserInfo> {
    // SAFETY: getuid/getgid cannot fail. getpwuid/getgrgid return pointers
    // into static storage that stays valid until the next call; every field
    // is copied into an owned String before this function returns.
    unsafe {
        let uid = libc::getuid();
        let pw = libc::getpwuid(uid);
        if pw.is_null() {
            return Err(anyhow!("no passwd entry for uid {uid}"));
        }
        let name = CStr::from_ptr((*pw).pw_name).to_string_lossy().into_owned();
        let home = CStr::from_ptr((*pw).pw_dir).to_string_lossy().into_owned();
        let gid = (*pw).pw_gid;

        let gr = libc::getgrgid(gid);
        let group = if gr.is_null() {
            gid.to_string()
        } else {
            CStr::from_ptr((*gr).gr_name).to_string_lossy().into_owned()
        };

        Ok(UserInfo {
            name,
            uid,
            gid,
            home,
            group,
        })
    }
}

#[cfg(not(unix))]
pub fn current_user() -> Result<UserInfo> {
    let name = std::env::var("USERNAME").map_err(|_| anyhow!("USERNAME is not set"))?;
    Ok(UserInfo {
        name: name.clone(),
        uid: 0,
        gid: 0,
        home: std::env::var("USERPROFILE").unwrap_or_default(),
        group: name,
    })
}

/// Login name used as the default exec-id.
pub fn login_name() -> Option<String> {
    current_user()
        .ok()
        .map(|u| u.name)
        .filter(|n| !n.is_empty())
        .or_else(|| std::env::var("USER").ok().filter(|n| !n.is_empty()))
}
