//! Configuração do plugpack carregada a partir de `plugpack.toml`.
//!
//! A struct [`PackConfig`] contém as quatro raízes (engine binária, engine
//! de código-fonte, plugin e pasta de saída) e os parâmetros das ferramentas.
//! Todos os demais caminhos são derivados dessas raízes.
//! Variáveis de ambiente `PLUGPACK_*` têm precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::PackError;

/// Nome padrão do arquivo de configuração no diretório atual.
pub const CONFIG_FILE: &str = "plugpack.toml";

/// Configuração imutável de uma execução, construída uma vez no início.
#[derive(Debug, Clone, Deserialize)]
pub struct PackConfig {
    /// Instalação binária da engine para a qual o plugin é empacotado.
    pub binary_engine: PathBuf,

    /// Instalação da engine compilada a partir do código-fonte, usada no build.
    pub source_engine: PathBuf,

    /// Raiz do plugin; deve ficar fora da pasta da engine.
    pub plugin_path: PathBuf,

    /// Destino do build; deve ficar fora do projeto.
    pub out_folder: PathBuf,

    /// Nome do produto, usado no descritor `.uplugin` e no arquivo compactado.
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Plataformas passadas em `-TargetPlatforms=`, unidas com `+`.
    #[serde(default = "default_target_platforms")]
    pub target_platforms: Vec<String>,

    /// Flags adicionais anexadas depois das flags fixas do comando de build.
    #[serde(default)]
    pub extra_build_flags: Vec<String>,

    /// Manifestos de módulo cujo `BuildId` é copiado da engine binária.
    #[serde(default = "default_module_manifests")]
    pub module_manifests: Vec<String>,

    /// Pasta da IDE dentro do plugin.
    #[serde(default = "default_ide_folder")]
    pub ide_folder: String,

    /// Arquivo de configurações locais da IDE que não pode ser empacotado.
    #[serde(default = "default_ide_user_settings")]
    pub ide_user_settings: String,

    /// Branch consultada para a revisão; `None` usa a branch atual.
    #[serde(default)]
    pub revision_branch: Option<String>,

    /// Executável do compactador.
    #[serde(default = "default_archiver")]
    pub archiver: String,

    /// Extensão do arquivo compactado.
    #[serde(default = "default_archive_ext")]
    pub archive_ext: String,

    /// Diretório onde o arquivo compactado é criado.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// Se falso, um código de saída não zero do compactador gera apenas um aviso.
    #[serde(default = "default_archive_failure_fatal")]
    pub archive_failure_fatal: bool,
}

fn default_product_name() -> String {
    "SkookumScript".to_string()
}

fn default_target_platforms() -> Vec<String> {
    vec!["Android".to_string(), "Win64".to_string()]
}

fn default_module_manifests() -> Vec<String> {
    vec![
        "UE4Editor.modules".to_string(),
        "UnrealHeaderTool.modules".to_string(),
    ]
}

fn default_ide_folder() -> String {
    "SkookumIDE".to_string()
}

fn default_ide_user_settings() -> String {
    "Skookum-user.ini".to_string()
}

fn default_archiver() -> String {
    "7z".to_string()
}

fn default_archive_ext() -> String {
    "7z".to_string()
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_archive_failure_fatal() -> bool {
    true
}

impl PackConfig {
    /// Cria uma configuração a partir das quatro raízes, com os demais valores padrão.
    #[cfg(test)]
    pub fn new(
        binary_engine: impl Into<PathBuf>,
        source_engine: impl Into<PathBuf>,
        plugin_path: impl Into<PathBuf>,
        out_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary_engine: binary_engine.into(),
            source_engine: source_engine.into(),
            plugin_path: plugin_path.into(),
            out_folder: out_folder.into(),
            product_name: default_product_name(),
            target_platforms: default_target_platforms(),
            extra_build_flags: Vec::new(),
            module_manifests: default_module_manifests(),
            ide_folder: default_ide_folder(),
            ide_user_settings: default_ide_user_settings(),
            revision_branch: None,
            archiver: default_archiver(),
            archive_ext: default_archive_ext(),
            archive_dir: default_archive_dir(),
            archive_failure_fatal: default_archive_failure_fatal(),
        }
    }

    /// Carrega a configuração do caminho informado ou de `plugpack.toml`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_FILE));
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Interpreta o conteúdo TOML, validando os campos obrigatórios.
    pub fn from_toml(contents: &str) -> Result<Self, PackError> {
        let config: PackConfig = toml::from_str(contents)?;
        if config.product_name.trim().is_empty() {
            return Err(PackError::Config("product_name must not be empty".into()));
        }
        if config.target_platforms.is_empty() {
            return Err(PackError::Config(
                "target_platforms must list at least one platform".into(),
            ));
        }
        Ok(config)
    }

    // Variáveis de ambiente têm precedência sobre o arquivo; valores vazios são ignorados.
    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let targets: [(&str, &mut PathBuf); 4] = [
            ("PLUGPACK_BINARY_ENGINE", &mut self.binary_engine),
            ("PLUGPACK_SOURCE_ENGINE", &mut self.source_engine),
            ("PLUGPACK_PLUGIN_PATH", &mut self.plugin_path),
            ("PLUGPACK_OUT_FOLDER", &mut self.out_folder),
        ];
        for (key, slot) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = PathBuf::from(value);
            }
        }
        self
    }

    /// Retorna uma cópia com a branch de revisão substituída.
    pub fn with_revision_branch(mut self, branch: Option<String>) -> Self {
        if branch.is_some() {
            self.revision_branch = branch;
        }
        self
    }

    /// Diretório `BatchFiles` da engine de código-fonte (diretório de trabalho do build).
    pub fn batch_files_dir(&self) -> PathBuf {
        self.source_engine
            .join("Engine")
            .join("Build")
            .join("BatchFiles")
    }

    /// Script de automação da engine.
    pub fn run_uat(&self) -> PathBuf {
        let script = if cfg!(windows) { "RunUAT.bat" } else { "RunUAT.sh" };
        self.batch_files_dir().join(script)
    }

    pub fn binary_win64(&self) -> PathBuf {
        self.binary_engine.join("Engine").join("Binaries").join("Win64")
    }

    pub fn out_win64(&self) -> PathBuf {
        self.out_folder.join("Binaries").join("Win64")
    }

    fn descriptor_name(&self) -> String {
        format!("{}.uplugin", self.product_name)
    }

    /// Descritor do plugin de origem, passado para `-Plugin=`.
    pub fn plugin_descriptor(&self) -> PathBuf {
        self.plugin_path.join(self.descriptor_name())
    }

    /// Descritor produzido pelo build, onde a versão é carimbada.
    pub fn out_descriptor(&self) -> PathBuf {
        self.out_folder.join(self.descriptor_name())
    }

    /// Arquivo `Build.version` da engine binária.
    pub fn engine_version_file(&self) -> PathBuf {
        self.binary_engine
            .join("Engine")
            .join("Build")
            .join("Build.version")
    }

    pub fn ide_dir(&self) -> PathBuf {
        self.plugin_path.join(&self.ide_folder)
    }

    /// Locais onde uma instalação prévia do plugin colidiria com o build.
    ///
    /// Ordem: binária `Runtime`, binária raiz, fonte `Runtime`, fonte raiz.
    pub fn installed_plugin_dirs(&self) -> Vec<PathBuf> {
        [&self.binary_engine, &self.source_engine]
            .into_iter()
            .flat_map(|engine| {
                let plugins = engine.join("Engine").join("Plugins");
                [
                    plugins.join("Runtime").join(&self.product_name),
                    plugins.join(&self.product_name),
                ]
            })
            .collect()
    }
}
