use camino::{Utf8Path, Utf8PathBuf};

/// One pinned patch: where its diff lives under the patches directory and
/// which directory inside the framework tree it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchEntry {
    pub name: &'static str,
    pub patch_file: &'static str,
    /// Relative to the framework root; empty means the root itself.
    pub target_subdir: &'static str,
    pub description: &'static str,
}

impl PatchEntry {
    /// Sentinel co-located with the patched tree. Its existence alone
    /// records a completed apply; the content is never read.
    pub fn marker_file_name(&self) -> String {
        format!(".{}-done", self.patch_file)
    }

    pub fn target_dir(&self, framework_dir: &Utf8Path) -> Utf8PathBuf {
        if self.target_subdir.is_empty() {
            framework_dir.to_path_buf()
        } else {
            framework_dir.join(self.target_subdir)
        }
    }
}

/// Registration order matters: the mbedTLS patches assume the IDF-level
/// hunks already landed, and the last two touch the same submodule tree.
pub const PATCHES: &[PatchEntry] = &[
    PatchEntry {
        name: "ds_idf",
        patch_file: "ds_idf.patch",
        target_subdir: "",
        description: "Digital Signature peripheral hooks for the IDF core tree",
    },
    PatchEntry {
        name: "ds_mbedtls",
        patch_file: "ds_mbedtls.patch",
        target_subdir: "components/mbedtls/mbedtls",
        description: "Digital Signature offload glue for the bundled mbedTLS",
    },
    PatchEntry {
        name: "mlkem_mbedtls",
        patch_file: "mlkem_mbedtls.patch",
        target_subdir: "components/mbedtls/mbedtls",
        description: "ML-KEM key exchange backport for the bundled mbedTLS",
    },
];

pub fn find(name: &str) -> Option<&'static PatchEntry> {
    PATCHES.iter().find(|entry| entry.name == name)
}
