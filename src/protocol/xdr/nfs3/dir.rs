//! Directory listing types of RFC 1813:
//! READDIRPLUS (procedure 17) arguments and entries.

#![allow(non_camel_case_types)]

use super::*;

/// One directory entry of a READDIRPLUS reply, with the attributes and
/// handle of the named object when the server supplies them.
#[derive(Debug, Default, Clone)]
pub struct entryplus3 {
    /// File identifier of the entry
    pub fileid: fileid3,
    /// Name of the entry
    pub name: filename3,
    /// Position token to pass back to resume the listing at this entry
    pub cookie: cookie3,
    pub name_attributes: post_op_attr,
    pub name_handle: post_op_fh3,
}
DeserializeStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);
SerializeStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);

/// Arguments for the READDIRPLUS procedure (RFC 1813 section 3.3.17)
#[derive(Debug, Default)]
pub struct READDIRPLUS3args {
    /// Directory file handle
    pub dir: nfs_fh3,
    /// Where to resume; zero starts a fresh listing
    pub cookie: cookie3,
    /// Cookie verifier returned by the previous call
    pub cookieverf: cookieverf3,
    /// Upper bound on bytes of directory information (names and ids)
    pub dircount: count3,
    /// Upper bound on bytes of the whole reply
    pub maxcount: count3,
}
DeserializeStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);
SerializeStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);
