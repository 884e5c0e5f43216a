/// Data layer: library files, header codec and classification metadata.
///
/// Architecture:
/// ```text
///   lib.sli + lib.hdr            spectra.csv
///        │                            │
///        ▼                            ▼
///   ┌──────────┐                ┌──────────┐
///   │  header   │  ENVI keys     │  model    │  SpectrumRecord rows
///   └──────────┘                └──────────┘
///        │                            │
///        ▼                            ▼
///   ┌──────────┐                ┌──────────┐
///   │  loader   │  f32 payload   │  filter   │  labels → row indices
///   └──────────┘                └──────────┘
///        │                            │
///        └──────────► Spectra ◄───────┘
/// ```

pub mod filter;
pub mod header;
pub mod loader;
pub mod model;
