//! 持久化键值存储
//!
//! Token 会话模式下，令牌和序列化的用户记录各占一个键。
//! 接口刻意保持 LocalStorage 的形状：读不到返回 `None`，写失败返回 `false`。

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> bool;
    fn delete(&self, key: &str) -> bool;
}

/// 进程内存储，进程退出即丢失
#[derive(Default)]
pub struct MemoryStore {
    map: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.map
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.map.borrow_mut().remove(key);
        true
    }
}

/// 文件存储：状态目录下每个键一个文件
///
/// 存的是 bearer token，Unix 上文件只对属主可读写（0600）。
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(file)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        let result = fs::create_dir_all(&self.dir).and_then(|_| write_private(&self.path(key), value));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to persist value");
                false
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        match fs::remove_file(self.path(key)) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to delete persisted value");
                false
            }
        }
    }
}

fn write_private(path: &Path, value: &str) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        // 已存在的文件不受 `mode` 影响
        if path.exists() {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
    }
    options.open(path)?.write_all(value.as_bytes())
}
