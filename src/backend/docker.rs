//! docker CLI 后端
//!
//! 每个后端操作对应一次 `docker ...` 调用（tokio::process，带超时与 tracing 审计）；
//! 列表类命令使用 `--format '{{json .}}'` 逐行解析，额外参数按 docker CLI 的 flag 形式透传。
//! exec / logs 的 stdout 与 stderr 写入同一条管道，输出保持实际的交错顺序。

use std::io::Read;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::process::Command;

use crate::backend::{short_id, BackendError, ContainerInfo, ExecOutput, ResourceBackend};

/// 这些参数由动作本身提供，不作为 flag 透传
const RESERVED_OPTIONS: &[&str] = &["name", "image", "detach"];

/// docker SDK 风格参数名到 CLI flag 的映射
const OPTION_ALIASES: &[(&str, &str)] = &[
    ("mem_limit", "memory"),
    ("memswap_limit", "memory-swap"),
    ("mem_reservation", "memory-reservation"),
    ("auto_remove", "rm"),
    ("network_mode", "network"),
    ("working_dir", "workdir"),
];

/// docker CLI 后端
pub struct DockerCli {
    bin: String,
    timeout_secs: u64,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            bin: bin.into(),
            timeout_secs,
        }
    }

    async fn run(&self, args: &[String]) -> Result<Output, BackendError> {
        tracing::debug!(bin = %self.bin, args = ?args, "docker command");

        let mut cmd = Command::new(&self.bin);
        cmd.args(args).kill_on_drop(true);

        let verb = args.first().map(String::as_str).unwrap_or("");
        tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| {
                BackendError::Unavailable(format!(
                    "docker {} timed out after {}s",
                    verb, self.timeout_secs
                ))
            })?
            .map_err(|e| BackendError::Unavailable(format!("failed to run {}: {}", self.bin, e)))
    }

    /// 执行并把 stdout / stderr 合并到同一条管道；返回 (退出码, 合并输出)
    async fn run_merged(&self, args: &[String]) -> Result<(i64, Vec<u8>), BackendError> {
        tracing::debug!(bin = %self.bin, args = ?args, "docker command (merged output)");
        let spawn_failed =
            |e: std::io::Error| BackendError::Unavailable(format!("failed to run {}: {}", self.bin, e));

        let (mut reader, writer) = std::io::pipe().map_err(spawn_failed)?;
        let mut cmd = Command::new(&self.bin);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone().map_err(spawn_failed)?)
            .stderr(writer)
            .kill_on_drop(true);
        let mut child = cmd.spawn().map_err(spawn_failed)?;
        // 父进程这一侧的写端随 cmd 释放，读端才能等到 EOF
        drop(cmd);

        let read = tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map(|_| buf)
        });

        let verb = args.first().map(String::as_str).unwrap_or("");
        let (status, output) = tokio::time::timeout(Duration::from_secs(self.timeout_secs), async {
            let status = child.wait().await?;
            let output = read.await.map_err(std::io::Error::other)??;
            Ok::<_, std::io::Error>((status, output))
        })
        .await
        .map_err(|_| {
            BackendError::Unavailable(format!(
                "docker {} timed out after {}s",
                verb, self.timeout_secs
            ))
        })?
        .map_err(spawn_failed)?;

        Ok((status.code().map(i64::from).unwrap_or(-1), output))
    }

    /// 执行并要求退出码为 0，返回 stdout
    async fn run_ok(&self, args: &[String], target: Option<&str>) -> Result<String, BackendError> {
        let output = self.run(args).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(classify_failure(&String::from_utf8_lossy(&output.stderr), target))
        }
    }
}

#[async_trait]
impl ResourceBackend for DockerCli {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, BackendError> {
        let out = self
            .run_ok(&args(&["ps", "-a", "--no-trunc", "--format", "{{json .}}"]), None)
            .await?;
        non_empty_lines(&out).map(parse_ps_line).collect()
    }

    async fn list_images(&self) -> Result<Vec<Vec<String>>, BackendError> {
        let out = self
            .run_ok(&args(&["images", "--no-trunc", "--format", "{{json .}}"]), None)
            .await?;
        parse_images(&out)
    }

    async fn list_networks(&self) -> Result<Vec<String>, BackendError> {
        let out = self
            .run_ok(&args(&["network", "ls", "--format", "{{.Name}}"]), None)
            .await?;
        Ok(non_empty_lines(&out).map(str::to_string).collect())
    }

    async fn list_volumes(&self) -> Result<Vec<String>, BackendError> {
        let out = self
            .run_ok(&args(&["volume", "ls", "--format", "{{.Name}}"]), None)
            .await?;
        Ok(non_empty_lines(&out).map(str::to_string).collect())
    }

    async fn create_container(
        &self,
        name: &str,
        image: &str,
        options: &Map<String, Value>,
    ) -> Result<ContainerInfo, BackendError> {
        let (flags, command) = option_flags(options)?;
        let mut argv = args(&["run", "-d", "--name", name]);
        argv.extend(flags);
        argv.push(image.to_string());
        argv.extend(command);

        let out = self.run_ok(&argv, None).await?;
        let id = out.lines().last().unwrap_or("").trim();
        Ok(ContainerInfo {
            id: short_id(id),
            name: name.to_string(),
            status: "running".to_string(),
            image: vec![image.to_string()],
        })
    }

    async fn remove_container(&self, name: &str) -> Result<(), BackendError> {
        self.run_ok(&args(&["rm", "-f", name]), Some(name)).await?;
        Ok(())
    }

    async fn update_container(
        &self,
        name: &str,
        options: &Map<String, Value>,
    ) -> Result<(), BackendError> {
        let (flags, command) = option_flags(options)?;
        if !command.is_empty() {
            return Err(BackendError::Failed(
                "command cannot be changed on an existing container".to_string(),
            ));
        }
        if flags.is_empty() {
            return Err(BackendError::Failed("no properties to update".to_string()));
        }
        let mut argv = args(&["update"]);
        argv.extend(flags);
        argv.push(name.to_string());
        self.run_ok(&argv, Some(name)).await?;
        Ok(())
    }

    async fn exec(&self, name: &str, command: &[String]) -> Result<ExecOutput, BackendError> {
        let mut argv = args(&["exec", name]);
        argv.extend(command.iter().cloned());
        let (exit_code, output) = self.run_merged(&argv).await?;

        if exit_code != 0 {
            let text = String::from_utf8_lossy(&output);
            // docker 自身的错误（容器不存在、守护进程不可达）与命令的非零退出码区分开
            if text.contains("Error response from daemon") || text.contains("Cannot connect") {
                return Err(classify_failure(&text, Some(name)));
            }
        }

        Ok(ExecOutput { exit_code, output })
    }

    async fn logs(&self, name: &str, tail: u32) -> Result<Vec<u8>, BackendError> {
        let (exit_code, output) = self
            .run_merged(&args(&["logs", "--tail", &tail.to_string(), name]))
            .await?;
        if exit_code != 0 {
            return Err(classify_failure(&String::from_utf8_lossy(&output), Some(name)));
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        "docker"
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn non_empty_lines(out: &str) -> impl Iterator<Item = &str> {
    out.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// 根据 stderr 判断失败类型
pub(crate) fn classify_failure(stderr: &str, target: Option<&str>) -> BackendError {
    let msg = stderr.trim();
    let lower = msg.to_lowercase();
    if lower.contains("cannot connect to the docker daemon")
        || lower.contains("is the docker daemon running")
        || lower.contains("error during connect")
    {
        BackendError::Unavailable(msg.to_string())
    } else if lower.contains("no such container") {
        BackendError::NotFound(target.unwrap_or(msg).to_string())
    } else if msg.is_empty() {
        BackendError::Failed("docker command failed".to_string())
    } else {
        BackendError::Failed(msg.to_string())
    }
}

#[derive(Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Image", default)]
    image: String,
}

/// 解析 `docker ps --format '{{json .}}'` 的一行
pub(crate) fn parse_ps_line(line: &str) -> Result<ContainerInfo, BackendError> {
    let ps: PsLine = serde_json::from_str(line)
        .map_err(|e| BackendError::Failed(format!("unexpected docker ps output: {}", e)))?;

    // 旧版本 docker 没有 State 字段，从 Status（"Up 2 hours" / "Exited (0) ..."）推断
    let status = if !ps.state.is_empty() {
        ps.state.to_lowercase()
    } else {
        let s = ps.status.to_lowercase();
        if s.starts_with("up") {
            "running".to_string()
        } else {
            s.split_whitespace().next().unwrap_or("unknown").to_string()
        }
    };

    let name = ps.names.split(',').next().unwrap_or("").trim().to_string();
    let image = if ps.image.is_empty() {
        vec![]
    } else {
        vec![ps.image]
    };

    Ok(ContainerInfo {
        id: short_id(&ps.id),
        name,
        status,
        image,
    })
}

#[derive(Deserialize)]
struct ImageLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Repository", default)]
    repository: String,
    #[serde(rename = "Tag", default)]
    tag: String,
}

/// 解析 `docker images --format '{{json .}}'`：同一镜像 ID 的多个标签合并为一项
pub(crate) fn parse_images(out: &str) -> Result<Vec<Vec<String>>, BackendError> {
    let mut images: Vec<(String, Vec<String>)> = Vec::new();
    for line in non_empty_lines(out) {
        let img: ImageLine = serde_json::from_str(line)
            .map_err(|e| BackendError::Failed(format!("unexpected docker images output: {}", e)))?;

        let tag = if img.repository.is_empty() || img.repository == "<none>" {
            None
        } else if img.tag.is_empty() || img.tag == "<none>" {
            None
        } else {
            Some(format!("{}:{}", img.repository, img.tag))
        };

        match images.iter_mut().find(|(id, _)| *id == img.id) {
            Some((_, tags)) => tags.extend(tag),
            None => images.push((img.id, tag.into_iter().collect())),
        }
    }
    Ok(images.into_iter().map(|(_, tags)| tags).collect())
}

/// 将透传参数转为 docker CLI flag；返回 (flags, 追加在镜像之后的命令)
pub(crate) fn option_flags(
    options: &Map<String, Value>,
) -> Result<(Vec<String>, Vec<String>), BackendError> {
    let mut flags = Vec::new();
    let mut command = Vec::new();

    for (key, value) in options {
        if RESERVED_OPTIONS.contains(&key.as_str()) || value.is_null() {
            continue;
        }
        match key.as_str() {
            "command" => command = string_list(key, value)?,
            "environment" | "env" => match value {
                Value::Object(vars) => {
                    for (k, v) in vars {
                        flags.push("-e".to_string());
                        flags.push(format!("{}={}", k, scalar(key, v)?));
                    }
                }
                _ => {
                    for item in string_list(key, value)? {
                        flags.push("-e".to_string());
                        flags.push(item);
                    }
                }
            },
            "ports" => match value {
                Value::Object(ports) => {
                    for (container_port, host) in ports {
                        flags.push("-p".to_string());
                        if host.is_null() {
                            flags.push(container_port.clone());
                        } else {
                            flags.push(format!("{}:{}", scalar(key, host)?, container_port));
                        }
                    }
                }
                _ => {
                    for item in string_list(key, value)? {
                        flags.push("-p".to_string());
                        flags.push(item);
                    }
                }
            },
            "volumes" => match value {
                Value::Object(binds) => {
                    for (host, spec) in binds {
                        let bind = spec
                            .get("bind")
                            .and_then(Value::as_str)
                            .ok_or_else(|| BackendError::Failed(format!("volume '{}' has no bind path", host)))?;
                        let mode = spec.get("mode").and_then(Value::as_str).unwrap_or("rw");
                        flags.push("-v".to_string());
                        flags.push(format!("{}:{}:{}", host, bind, mode));
                    }
                }
                _ => {
                    for item in string_list(key, value)? {
                        flags.push("-v".to_string());
                        flags.push(item);
                    }
                }
            },
            "labels" => match value {
                Value::Object(labels) => {
                    for (k, v) in labels {
                        flags.push(format!("--label={}={}", k, scalar(key, v)?));
                    }
                }
                _ => {
                    for item in string_list(key, value)? {
                        flags.push(format!("--label={}", item));
                    }
                }
            },
            "restart_policy" => {
                let policy = match value {
                    Value::Object(p) => p
                        .get("Name")
                        .or_else(|| p.get("name"))
                        .and_then(Value::as_str)
                        .unwrap_or("no")
                        .to_string(),
                    other => scalar(key, other)?,
                };
                flags.push(format!("--restart={}", policy));
            }
            _ => {
                let flag = OPTION_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == key)
                    .map(|(_, f)| f.to_string())
                    .unwrap_or_else(|| key.replace('_', "-"));
                match value {
                    Value::Bool(true) => flags.push(format!("--{}", flag)),
                    Value::Bool(false) => {}
                    Value::Array(items) => {
                        for item in items {
                            flags.push(format!("--{}={}", flag, scalar(key, item)?));
                        }
                    }
                    other => flags.push(format!("--{}={}", flag, scalar(key, other)?)),
                }
            }
        }
    }

    Ok((flags, command))
}

fn scalar(key: &str, value: &Value) -> Result<String, BackendError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(BackendError::Failed(format!(
            "unsupported value for option '{}': {}",
            key, value
        ))),
    }
}

fn string_list(key: &str, value: &Value) -> Result<Vec<String>, BackendError> {
    match value {
        Value::String(s) => shlex::split(s)
            .ok_or_else(|| BackendError::Failed(format!("option '{}' has unbalanced quotes", key))),
        Value::Array(items) => items.iter().map(|v| scalar(key, v)).collect(),
        other => Ok(vec![scalar(key, other)?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_ps_line_with_state() {
        let line = r#"{"ID":"abc123def4567890","Names":"web","State":"running","Status":"Up 2 hours","Image":"nginx:latest"}"#;
        let c = parse_ps_line(line).unwrap();
        assert_eq!(c.id, "abc123def456");
        assert_eq!(c.name, "web");
        assert_eq!(c.status, "running");
        assert_eq!(c.image, vec!["nginx:latest".to_string()]);
    }

    #[test]
    fn test_parse_ps_line_infers_state_from_status() {
        let line = r#"{"ID":"def456","Names":"db","Status":"Exited (0) 3 minutes ago","Image":"postgres"}"#;
        let c = parse_ps_line(line).unwrap();
        assert_eq!(c.status, "exited");

        let line = r#"{"ID":"def456","Names":"db","Status":"Up 5 seconds","Image":"postgres"}"#;
        assert_eq!(parse_ps_line(line).unwrap().status, "running");
    }

    #[test]
    fn test_parse_ps_line_rejects_garbage() {
        assert!(matches!(parse_ps_line("not json"), Err(BackendError::Failed(_))));
    }

    #[test]
    fn test_parse_images_groups_tags_by_id() {
        let out = concat!(
            r#"{"ID":"sha256:1","Repository":"nginx","Tag":"latest"}"#, "\n",
            r#"{"ID":"sha256:1","Repository":"nginx","Tag":"1.25"}"#, "\n",
            r#"{"ID":"sha256:2","Repository":"<none>","Tag":"<none>"}"#, "\n",
            "\n",
            r#"{"ID":"sha256:3","Repository":"redis","Tag":"7"}"#, "\n",
        );
        let images = parse_images(out).unwrap();
        assert_eq!(
            images,
            vec![
                vec!["nginx:latest".to_string(), "nginx:1.25".to_string()],
                vec![],
                vec!["redis:7".to_string()],
            ]
        );
    }

    fn has_pair(flags: &[String], flag: &str, value: &str) -> bool {
        flags.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn test_option_flags_translates_sdk_style_options() {
        let (flags, command) = option_flags(&opts(json!({
            "environment": {"MODE": "prod"},
            "ports": {"80/tcp": 8080},
            "mem_limit": "512m",
            "auto_remove": true,
            "privileged": false,
            "command": "sleep 3600",
            "name": "ignored",
        })))
        .unwrap();

        assert_eq!(flags.len(), 6);
        assert!(flags.contains(&"--rm".to_string()));
        assert!(flags.contains(&"--memory=512m".to_string()));
        assert!(has_pair(&flags, "-e", "MODE=prod"));
        assert!(has_pair(&flags, "-p", "8080:80/tcp"));
        assert!(!flags.iter().any(|f| f.contains("privileged") || f.contains("ignored")));
        assert_eq!(command, vec!["sleep".to_string(), "3600".to_string()]);
    }

    #[test]
    fn test_option_flags_command_uses_shell_quoting() {
        let (_, command) = option_flags(&opts(json!({
            "command": "sh -c 'while true; do date; sleep 5; done'",
        })))
        .unwrap();
        assert_eq!(
            command,
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "while true; do date; sleep 5; done".to_string()
            ]
        );

        let err = option_flags(&opts(json!({"command": "echo \"oops"}))).unwrap_err();
        assert!(matches!(err, BackendError::Failed(msg) if msg.contains("unbalanced")));
    }

    #[test]
    fn test_option_flags_restart_policy_and_volumes() {
        let (flags, _) = option_flags(&opts(json!({
            "restart_policy": {"Name": "always"},
            "volumes": {"/data": {"bind": "/var/lib/data", "mode": "ro"}},
        })))
        .unwrap();
        assert_eq!(flags.len(), 3);
        assert!(flags.contains(&"--restart=always".to_string()));
        assert!(has_pair(&flags, "-v", "/data:/var/lib/data:ro"));
    }

    #[test]
    fn test_option_flags_rejects_nested_generic_option() {
        let err = option_flags(&opts(json!({"healthcheck": {"test": ["CMD"]}}))).unwrap_err();
        assert!(matches!(err, BackendError::Failed(msg) if msg.contains("healthcheck")));
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure("Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?", None),
            BackendError::Unavailable(_)
        ));
        assert_eq!(
            classify_failure("Error response from daemon: No such container: db", Some("db")),
            BackendError::NotFound("db".to_string())
        );
        assert_eq!(classify_failure("", None), BackendError::Failed("docker command failed".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let docker = DockerCli::new("hivectl-test-no-such-docker-binary", 5);
        let err = docker.list_networks().await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));

        let err = docker.logs("web", 5).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    /// 假的 docker 可执行文件：logs 交替写 stdout / stderr，exec 以 3 退出
    #[cfg(unix)]
    const FAKE_DOCKER: &str = r#"#!/bin/sh
if [ "$2" = "missing" ] || [ "$4" = "missing" ]; then
  echo "Error response from daemon: No such container: missing" >&2
  exit 1
fi
case "$1" in
  logs)
    i=96
    while [ $i -le 100 ]; do
      if [ $((i % 2)) -eq 1 ]; then echo "line $i" >&2; else echo "line $i"; fi
      i=$((i + 1))
    done
    ;;
  exec)
    echo "out 1"
    echo "err 1" >&2
    echo "out 2"
    exit 3
    ;;
esac
"#;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_logs_and_exec_keep_stream_order() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("docker");
        std::fs::write(&bin, FAKE_DOCKER).unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        let docker = DockerCli::new(bin.to_string_lossy(), 5);

        let logs = docker.logs("web", 5).await.unwrap();
        assert_eq!(
            String::from_utf8(logs).unwrap(),
            "line 96\nline 97\nline 98\nline 99\nline 100\n"
        );

        let out = docker
            .exec("web", &["sh".to_string(), "-c".to_string(), "true".to_string()])
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(String::from_utf8(out.output).unwrap(), "out 1\nerr 1\nout 2\n");

        let err = docker.logs("missing", 5).await.unwrap_err();
        assert_eq!(err, BackendError::NotFound("missing".into()));
        let err = docker.exec("missing", &["ls".to_string()]).await.unwrap_err();
        assert_eq!(err, BackendError::NotFound("missing".into()));
    }
}
