//! Source discovery and declaration extraction

use super::{DeclarationKind, DeclarationNode, SourceLocation};
use crate::codegen::compute_string_hash;
use crate::error::{CodegenError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syn::visit::{self, Visit};
use walkdir::WalkDir;

/// Parse one Rust source file and list its declarations in source order
pub fn parse_declarations(source: &str, file: &Path) -> Result<Vec<DeclarationNode>> {
    let syntax = syn::parse_file(source).map_err(|source| CodegenError::Parse {
        path: file.to_path_buf(),
        source,
    })?;

    let mut collector = DeclarationCollector {
        file,
        module_path: Vec::new(),
        nodes: Vec::new(),
    };
    collector.visit_file(&syntax);
    Ok(collector.nodes)
}

struct DeclarationCollector<'a> {
    file: &'a Path,
    module_path: Vec<String>,
    nodes: Vec<DeclarationNode>,
}

impl DeclarationCollector<'_> {
    fn push(&mut self, kind: DeclarationKind, ident: &syn::Ident) {
        let location = SourceLocation {
            file: self.file.to_path_buf(),
            module_path: self.module_path.join("::"),
        };
        self.nodes
            .push(DeclarationNode::new(kind, ident.to_string()).with_location(location));
    }
}

impl<'ast> Visit<'ast> for DeclarationCollector<'_> {
    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        self.push(DeclarationKind::Struct, &node.ident);
        visit::visit_item_struct(self, node);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        self.push(DeclarationKind::Enum, &node.ident);
        visit::visit_item_enum(self, node);
    }

    fn visit_item_union(&mut self, node: &'ast syn::ItemUnion) {
        self.push(DeclarationKind::Union, &node.ident);
        visit::visit_item_union(self, node);
    }

    fn visit_item_trait(&mut self, node: &'ast syn::ItemTrait) {
        self.push(DeclarationKind::Trait, &node.ident);
        visit::visit_item_trait(self, node);
    }

    fn visit_item_type(&mut self, node: &'ast syn::ItemType) {
        self.push(DeclarationKind::TypeAlias, &node.ident);
        visit::visit_item_type(self, node);
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.push(DeclarationKind::Function, &node.sig.ident);
        visit::visit_item_fn(self, node);
    }

    fn visit_item_const(&mut self, node: &'ast syn::ItemConst) {
        self.push(DeclarationKind::Const, &node.ident);
        visit::visit_item_const(self, node);
    }

    fn visit_item_static(&mut self, node: &'ast syn::ItemStatic) {
        self.push(DeclarationKind::Static, &node.ident);
        visit::visit_item_static(self, node);
    }

    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        self.push(DeclarationKind::Module, &node.ident);
        self.module_path.push(node.ident.to_string());
        visit::visit_item_mod(self, node);
        self.module_path.pop();
    }

    fn visit_field(&mut self, node: &'ast syn::Field) {
        // tuple fields have no declared name
        if let Some(ident) = &node.ident {
            self.push(DeclarationKind::Field, ident);
        }
        visit::visit_field(self, node);
    }

    fn visit_variant(&mut self, node: &'ast syn::Variant) {
        self.push(DeclarationKind::Variant, &node.ident);
        visit::visit_variant(self, node);
    }
}

#[derive(Debug)]
struct CachedFile {
    content_hash: String,
    declarations: Arc<Vec<DeclarationNode>>,
}

/// Result of one scan over the source roots
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Every file that matched the include/exclude globs, sorted
    pub files: Vec<PathBuf>,
    /// Declarations of all parsable files, file by file in source order
    pub declarations: Vec<DeclarationNode>,
    pub parsed: usize,
    pub reused: usize,
    /// Files that were not valid UTF-8 or did not parse, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

/// Walks source roots and extracts declarations, caching per file content
#[derive(Debug)]
pub struct SourceScanner {
    roots: Vec<PathBuf>,
    include: GlobSet,
    exclude: GlobSet,
    cache: RwLock<HashMap<PathBuf, CachedFile>>,
}

impl SourceScanner {
    pub fn new<S: AsRef<str>>(roots: Vec<PathBuf>, include: &[S], exclude: &[S]) -> Result<Self> {
        if roots.is_empty() {
            return Err(CodegenError::config("at least one source root is required"));
        }
        Ok(Self {
            roots,
            include: build_glob_set(include)?,
            exclude: build_glob_set(exclude)?,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// List matching source files under every root, sorted and deduplicated
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for root in &self.roots {
            if !root.exists() {
                return Err(CodegenError::config(format!(
                    "source root {:?} does not exist",
                    root
                )));
            }

            if root.is_file() {
                files.push(root.clone());
                continue;
            }

            for entry in WalkDir::new(root)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let relative = path.strip_prefix(root).unwrap_or(path);
                if self.include.is_match(relative) && !self.exclude.is_match(relative) {
                    files.push(path.to_path_buf());
                }
            }
        }

        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Discover and parse every source file
    ///
    /// Unparsable and non-UTF-8 files are skipped with a warning; the host
    /// compiler reports those errors on its own. Other I/O errors are fatal.
    pub fn scan(&self) -> Result<ScanOutcome> {
        let files = self.discover()?;

        let results: Vec<(PathBuf, Result<(Arc<Vec<DeclarationNode>>, bool)>)> = files
            .par_iter()
            .map(|path| (path.clone(), self.scan_file_tracked(path)))
            .collect();

        let mut outcome = ScanOutcome {
            files,
            ..ScanOutcome::default()
        };

        for (path, result) in results {
            match result {
                Ok((declarations, reused)) => {
                    if reused {
                        outcome.reused += 1;
                    } else {
                        outcome.parsed += 1;
                    }
                    outcome.declarations.extend(declarations.iter().cloned());
                }
                Err(error) if error.is_recoverable() => {
                    tracing::warn!(file = %path.display(), %error, "skipping unparsable source file");
                    outcome.skipped.push((path, error.to_string()));
                }
                Err(error) => return Err(error),
            }
        }

        self.evict_missing(&outcome.files);

        tracing::debug!(
            files = outcome.files.len(),
            parsed = outcome.parsed,
            reused = outcome.reused,
            skipped = outcome.skipped.len(),
            declarations = outcome.declarations.len(),
            "source scan complete"
        );

        Ok(outcome)
    }

    /// Declarations of a single file, served from cache when the content is unchanged
    pub fn scan_file(&self, path: &Path) -> Result<Arc<Vec<DeclarationNode>>> {
        self.scan_file_tracked(path).map(|(declarations, _)| declarations)
    }

    fn scan_file_tracked(&self, path: &Path) -> Result<(Arc<Vec<DeclarationNode>>, bool)> {
        let source = fs::read_to_string(path).map_err(|e| CodegenError::io(path, e))?;
        let content_hash = compute_string_hash(&source);

        if let Some(cached) = self.cache.read().get(path) {
            if cached.content_hash == content_hash {
                return Ok((cached.declarations.clone(), true));
            }
        }

        let declarations = Arc::new(parse_declarations(&source, path)?);
        self.cache.write().insert(
            path.to_path_buf(),
            CachedFile {
                content_hash,
                declarations: declarations.clone(),
            },
        );
        Ok((declarations, false))
    }

    fn evict_missing(&self, files: &[PathBuf]) {
        let mut cache = self.cache.write();
        cache.retain(|path, _| files.binary_search(path).is_ok());
    }

    /// Number of files currently held in the parse cache
    pub fn cached_files(&self) -> usize {
        self.cache.read().len()
    }
}

fn build_glob_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = Glob::new(pattern).map_err(|source| CodegenError::Glob {
            pattern: pattern.to_string(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| CodegenError::Glob {
        pattern: "<set>".to_string(),
        source,
    })
}
