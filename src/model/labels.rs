// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/labels.rs - 类别标签表
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::Path;

use tracing::{debug, info};

/// 有序标签表，下标即类别编号
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
  names: Box<[String]>,
}

impl Labels {
  /// 从标签文件读取，每行一个标签
  pub fn load(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let labels = Self::from_text(&text);
    info!("标签数量: {}", labels.len());
    Ok(labels)
  }

  /// 按 `\n` 切分文本，丢弃末尾的空行，并去掉每行末尾的 `\r`
  pub fn from_text(text: &str) -> Self {
    let mut names: Vec<String> = text
      .split('\n')
      .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
      .collect();
    while names.last().is_some_and(|name| name.is_empty()) {
      names.pop();
    }
    debug!("解析得到 {} 个标签", names.len());
    Self {
      names: names.into_boxed_slice(),
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

impl<S: Into<String>> FromIterator<S> for Labels {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self {
      names: iter.into_iter().map(Into::into).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn trailing_newline_does_not_add_a_label() {
    let labels = Labels::from_text("cat\ndog\nbird\n\n");
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(2), Some("bird"));
    assert_eq!(labels.get(3), None);
  }

  #[test]
  fn inner_empty_lines_keep_their_index() {
    let labels = Labels::from_text("cat\n\ndog");
    assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["cat", "", "dog"]);
  }

  #[test]
  fn windows_line_endings_are_stripped() {
    let labels = Labels::from_text("cat\r\ndog\r\n");
    assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["cat", "dog"]);
  }

  #[test]
  fn empty_text_gives_empty_table() {
    assert!(Labels::from_text("").is_empty());
    assert!(Labels::from_text("\n\n").is_empty());
  }

  #[test]
  fn load_reads_label_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "tench\ngoldfish\ngreat white shark\n").unwrap();
    let labels = Labels::load(file.path()).unwrap();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(1), Some("goldfish"));
  }

  #[test]
  fn load_reports_missing_file() {
    assert!(Labels::load("/nonexistent/labels.txt").is_err());
  }
}
