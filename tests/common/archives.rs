use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};

/// One archive member for test archives.
pub enum Member<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
    /// File whose header name is written verbatim, bypassing the tar
    /// builder's own path checks.
    RawFile(&'a str, &'a [u8]),
    Symlink(&'a str, &'a str),
}

pub fn tar_bytes(members: &[Member<'_>]) -> Vec<u8> {
    let mut builder = Builder::new(Vec::new());
    for member in members {
        match member {
            Member::File(path, data) => {
                let mut header = Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_entry_type(EntryType::Regular);
                builder.append_data(&mut header, path, *data).unwrap();
            }
            Member::Dir(path) => {
                let mut header = Header::new_gnu();
                header.set_size(0);
                header.set_mode(0o755);
                header.set_entry_type(EntryType::Directory);
                builder
                    .append_data(&mut header, path, std::io::empty())
                    .unwrap();
            }
            Member::RawFile(path, data) => {
                let mut header = Header::new_gnu();
                {
                    let name = &mut header.as_gnu_mut().unwrap().name;
                    name[..path.len()].copy_from_slice(path.as_bytes());
                }
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_entry_type(EntryType::Regular);
                header.set_cksum();
                builder.append(&header, *data).unwrap();
            }
            Member::Symlink(path, target) => {
                let mut header = Header::new_gnu();
                header.set_size(0);
                header.set_mode(0o777);
                header.set_entry_type(EntryType::Symlink);
                header.set_link_name(target).unwrap();
                builder
                    .append_data(&mut header, path, std::io::empty())
                    .unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Pack every file of a dataset directory (index + labels) into a tar,
/// with `./`-prefixed names like `tar -C dir -cf - .` produces.
pub fn dataset_tar(dir: &std::path::Path) -> Vec<u8> {
    let meta = std::fs::read(dir.join("anng/meta.json")).unwrap();
    let vectors = std::fs::read(dir.join("anng/vectors.bin")).unwrap();
    let names = std::fs::read(dir.join("names.txt")).unwrap();
    tar_bytes(&[
        Member::Dir("./"),
        Member::Dir("./anng/"),
        Member::File("./anng/meta.json", &meta),
        Member::File("./anng/vectors.bin", &vectors),
        Member::File("./names.txt", &names),
    ])
}
