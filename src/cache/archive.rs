//! Tar packing and unpacking of dependency directories
//!
//! Archives are plain (uncompressed) tar. Symlinks are stored as links,
//! never followed, and permission bits are kept so `.bin` shims stay
//! executable after extraction.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tar::{Archive, Builder};

/// Write the contents of `src` (not `src` itself) as a tar stream.
///
/// Entries are added in lexicographic order so the same tree always yields
/// the same member order. An empty directory yields a valid, empty archive.
pub fn pack_directory<W: Write>(src: &Path, writer: W) -> io::Result<W> {
    let mut builder = Builder::new(writer);
    builder.follow_symlinks(false);

    append_tree(&mut builder, src, Path::new(""))?;

    builder.into_inner()
}

fn append_tree<W: Write>(builder: &mut Builder<W>, dir: &Path, prefix: &Path) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = prefix.join(entry.file_name());

        // file_type() does not follow symlinks, so linked directories are not descended
        let file_type = entry.file_type()?;
        builder.append_path_with_name(&path, &name)?;

        if file_type.is_dir() {
            append_tree(builder, &path, &name)?;
        }
    }

    Ok(())
}

/// Unpack a tar stream into `dest`, which must exist.
pub fn unpack_archive<R: Read>(reader: R, dest: &Path) -> io::Result<()> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(true);
    archive.unpack(dest)
}
