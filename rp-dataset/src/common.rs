pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use derivative::Derivative;
pub use indexmap::IndexMap;
pub use itertools::{izip, Itertools as _};
pub use log::{debug, info, warn};
pub use ndarray::{s, Array2, Array3, Array4, ArrayD, ArrayView3, Axis};
pub use noisy_float::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{Deserialize, Serialize};
pub use std::{
    cmp,
    collections::HashMap,
    fmt,
    fmt::Debug,
    fs, mem,
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

#[cfg(feature = "profiling")]
pub use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
pub use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

unzip_n::unzip_n!(pub 4);
