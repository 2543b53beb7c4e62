//! Playwright browser automation
//!
//! [`PlaywrightPage`] keeps one Node.js driver process alive per page. The
//! driver script is generated into a temp dir, launches the browser and then
//! serves one JSON request per stdin line, answering on stdout with the same
//! `id`. Replies whose `id` does not match the pending request (left over from
//! a call the executor abandoned on timeout) are skipped.

use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult, PageError, PageResult};
use crate::page::{
    AnimationSample, InteractionTrace, PageFactory, PageHandle, StyleSnapshot,
    FEEDBACK_STYLE_PROPERTIES,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser '{}'", other)),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Node.js executable used to run the driver
    pub node_binary: String,

    /// How long browser startup may take
    pub launch_timeout_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_binary: "node".to_string(),
            launch_timeout_ms: 30_000,
        }
    }
}

/// Check that Node.js can resolve the `playwright` package from the current directory
pub fn check_playwright_installed(config: &PlaywrightConfig) -> EngineResult<()> {
    let status = Command::new(&config.node_binary)
        .args(["-e", "require.resolve('playwright', { paths: [process.cwd()] })"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(EngineError::PlaywrightNotFound),
    }
}

// ============================================================================
// Wire protocol
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Request<'a> {
    Navigate {
        url: &'a str,
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },
    WaitForSelector {
        selector: &'a str,
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },
    Click {
        selector: &'a str,
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },
    Hover {
        selector: &'a str,
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },
    TypeText {
        selector: &'a str,
        text: &'a str,
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },
    IsEditable {
        selector: &'a str,
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },
    TextContent {
        selector: &'a str,
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },
    ComputedStyle {
        selector: &'a str,
        properties: &'a [&'a str],
    },
    Animations {
        selector: &'a str,
    },
    BeginTrace,
    EndTrace {
        #[serde(rename = "windowMs")]
        window_ms: u64,
    },
    Close,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    request: Request<'a>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<ReplyError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyError {
    kind: String,
    message: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

impl ReplyError {
    fn into_page_error(self) -> PageError {
        match self.kind.as_str() {
            "timeout" => PageError::Timeout(self.timeout_ms.unwrap_or_default()),
            "notFound" => PageError::ElementNotFound(self.message),
            "navigation" => PageError::Navigation(self.message),
            "detached" => PageError::Detached(self.message),
            "crashed" => PageError::Crashed(self.message),
            _ => PageError::Protocol(self.message),
        }
    }
}

// ============================================================================
// Page
// ============================================================================

/// A browser page driven through a Playwright Node.js process
pub struct PlaywrightPage {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    closed: bool,

    /// Keeps the generated driver script alive
    _script_dir: TempDir,
}

impl PlaywrightPage {
    /// Start the driver and wait for the browser to come up
    pub async fn launch(config: &PlaywrightConfig) -> EngineResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("craftprobe-driver.js");
        std::fs::write(&script_path, build_driver_script(config))?;

        debug!("Starting Playwright driver: {}", script_path.display());

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Playwright("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Playwright("driver stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "craftprobe::driver", "{}", line);
                }
            });
        }

        let mut stdout = BufReader::new(stdout).lines();
        let ready = tokio::time::timeout(
            Duration::from_millis(config.launch_timeout_ms),
            stdout.next_line(),
        )
        .await;

        match ready {
            Ok(Ok(Some(line))) if line.contains("\"ready\"") => {}
            Ok(Ok(Some(line))) => {
                return Err(EngineError::Playwright(format!("unexpected driver greeting: {}", line)));
            }
            Ok(Ok(None)) => {
                return Err(EngineError::Playwright(
                    "driver exited during startup (is playwright installed?)".to_string(),
                ));
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(EngineError::Playwright(format!(
                    "browser did not start within {} ms",
                    config.launch_timeout_ms
                )));
            }
        }

        info!(
            browser = config.browser.as_str(),
            headless = config.headless,
            "Playwright page ready"
        );

        Ok(Self {
            child,
            stdin,
            stdout,
            next_id: 0,
            closed: false,
            _script_dir: script_dir,
        })
    }

    async fn call<T: DeserializeOwned>(&mut self, request: Request<'_>) -> PageResult<T> {
        if self.closed {
            return Err(PageError::Detached("page already closed".to_string()));
        }

        self.next_id += 1;
        let id = self.next_id;

        let mut line = serde_json::to_string(&Envelope { id, request })
            .map_err(|e| PageError::Protocol(e.to_string()))?;
        line.push('\n');

        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| PageError::Crashed(format!("driver stdin closed: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| PageError::Crashed(format!("driver stdin closed: {}", e)))?;

        loop {
            let line = match self.stdout.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return Err(PageError::Crashed("driver exited".to_string())),
                Err(e) => return Err(PageError::Crashed(e.to_string())),
            };

            let reply: Reply = match serde_json::from_str(&line) {
                Ok(reply) => reply,
                Err(_) => {
                    debug!(target: "craftprobe::driver", "{}", line);
                    continue;
                }
            };

            if reply.id != Some(id) {
                debug!(expected = id, got = ?reply.id, "skipping stale driver reply");
                continue;
            }

            if reply.ok {
                return serde_json::from_value(reply.value)
                    .map_err(|e| PageError::Protocol(format!("unexpected reply: {}", e)));
            }

            return Err(reply
                .error
                .map(ReplyError::into_page_error)
                .unwrap_or_else(|| PageError::Protocol("error reply without detail".to_string())));
        }
    }
}

#[async_trait]
impl PageHandle for PlaywrightPage {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> PageResult<()> {
        self.call::<serde_json::Value>(Request::Navigate { url, timeout_ms }).await?;
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout_ms: u64) -> PageResult<()> {
        self.call::<serde_json::Value>(Request::WaitForSelector { selector, timeout_ms }).await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str, timeout_ms: u64) -> PageResult<()> {
        self.call::<serde_json::Value>(Request::Click { selector, timeout_ms }).await?;
        Ok(())
    }

    async fn hover(&mut self, selector: &str, timeout_ms: u64) -> PageResult<()> {
        self.call::<serde_json::Value>(Request::Hover { selector, timeout_ms }).await?;
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str, timeout_ms: u64) -> PageResult<()> {
        self.call::<serde_json::Value>(Request::TypeText { selector, text, timeout_ms }).await?;
        Ok(())
    }

    async fn is_editable(&mut self, selector: &str, timeout_ms: u64) -> PageResult<bool> {
        self.call(Request::IsEditable { selector, timeout_ms }).await
    }

    async fn text_content(&mut self, selector: &str, timeout_ms: u64) -> PageResult<Option<String>> {
        self.call(Request::TextContent { selector, timeout_ms }).await
    }

    async fn computed_style(&mut self, selector: &str) -> PageResult<StyleSnapshot> {
        self.call(Request::ComputedStyle {
            selector,
            properties: FEEDBACK_STYLE_PROPERTIES,
        })
        .await
    }

    async fn animations(&mut self, selector: &str) -> PageResult<Vec<AnimationSample>> {
        self.call(Request::Animations { selector }).await
    }

    async fn begin_trace(&mut self) -> PageResult<()> {
        self.call::<serde_json::Value>(Request::BeginTrace).await?;
        Ok(())
    }

    async fn end_trace(&mut self, window_ms: u64) -> PageResult<InteractionTrace> {
        self.call(Request::EndTrace { window_ms }).await
    }

    async fn close(&mut self) -> PageResult<()> {
        if self.closed {
            return Ok(());
        }
        if let Err(e) = self.call::<serde_json::Value>(Request::Close).await {
            warn!("driver did not acknowledge close: {}", e);
        }
        self.closed = true;

        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!("Playwright driver exited: {}", status),
            _ => {
                warn!("Playwright driver did not exit, killing it");
                self.child
                    .kill()
                    .await
                    .map_err(|e| PageError::Protocol(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Launches one [`PlaywrightPage`] per run
#[derive(Debug, Clone, Default)]
pub struct PlaywrightFactory {
    config: PlaywrightConfig,
}

impl PlaywrightFactory {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PageFactory for PlaywrightFactory {
    type Page = PlaywrightPage;

    async fn open(&self) -> PageResult<PlaywrightPage> {
        PlaywrightPage::launch(&self.config)
            .await
            .map_err(|e| PageError::Crashed(e.to_string()))
    }
}

// ============================================================================
// Driver script
// ============================================================================

/// Build the Node.js driver for a configuration
pub fn build_driver_script(config: &PlaywrightConfig) -> String {
    DRIVER_TEMPLATE
        .replace("%BROWSER%", config.browser.as_str())
        .replace("%HEADLESS%", if config.headless { "true" } else { "false" })
        .replace("%WIDTH%", &config.viewport_width.to_string())
        .replace("%HEIGHT%", &config.viewport_height.to_string())
}

const DRIVER_TEMPLATE: &str = r#"
const { createRequire } = require('module');
const readline = require('readline');
const playwright = createRequire(process.cwd() + '/')('playwright');

// Installed into every document before page scripts run
const PROBE = () => {
  const probe = {
    tracing: false,
    mutations: 0,
    keyLatencies: [],
    lastKey: null,
    keyTarget: null,
    layoutShifts: 0,
    layoutSupported: false,
  };
  window.__craftprobe = probe;

  // Native text fields change .value without producing mutation records
  const isTextField = (el) => !!el && ['INPUT', 'TEXTAREA'].includes(el.tagName);

  // A keystroke is visible on the first frame painted after its update
  const settleKey = () => {
    const started = probe.lastKey;
    probe.lastKey = null;
    probe.keyTarget = null;
    requestAnimationFrame(() => probe.keyLatencies.push(performance.now() - started));
  };

  new MutationObserver((records) => {
    if (!probe.tracing) return;
    probe.mutations += records.length;
    // Fallback for contenteditable and widgets that re-render on keydown
    if (probe.lastKey !== null && !isTextField(probe.keyTarget)) settleKey();
  }).observe(document, { subtree: true, childList: true, attributes: true, characterData: true });

  document.addEventListener('keydown', (event) => {
    if (!probe.tracing) return;
    probe.lastKey = performance.now();
    probe.keyTarget = event.target;
  }, true);

  document.addEventListener('input', (event) => {
    if (probe.tracing && probe.lastKey !== null && event.target === probe.keyTarget) settleKey();
  }, true);

  try {
    new PerformanceObserver((list) => {
      if (probe.tracing) probe.layoutShifts += list.getEntries().length;
    }).observe({ type: 'layout-shift' });
    probe.layoutSupported = true;
  } catch (e) {
    probe.layoutSupported = false;
  }
};

const classify = (error, req) => {
  const message = String((error && error.message) || error).split('\n')[0];
  let kind = 'protocol';
  if (error && error.name === 'TimeoutError') kind = 'timeout';
  else if (/crash/i.test(message)) kind = 'crashed';
  else if (/closed|detached/i.test(message)) kind = 'detached';
  else if (/net::|NS_ERROR|navigat/i.test(message)) kind = 'navigation';
  else if (/failed to find element|no element|not found/i.test(message)) kind = 'notFound';
  return { kind, message, timeoutMs: req.timeoutMs || null };
};

// keyboard.type has no timeout of its own
const withTimeout = (promise, ms) => {
  let timer;
  const expired = new Promise((_, reject) => {
    timer = setTimeout(() => {
      const error = new Error('keyboard input exceeded ' + ms + 'ms');
      error.name = 'TimeoutError';
      reject(error);
    }, ms);
  });
  return Promise.race([promise, expired]).finally(() => clearTimeout(timer));
};

const handlers = {
  navigate: (page, req) => page.goto(req.url, { timeout: req.timeoutMs, waitUntil: 'load' }).then(() => null),
  waitForSelector: (page, req) =>
    page.waitForSelector(req.selector, { state: 'visible', timeout: req.timeoutMs }).then(() => null),
  click: (page, req) => page.click(req.selector, { timeout: req.timeoutMs }),
  hover: (page, req) => page.hover(req.selector, { timeout: req.timeoutMs }),
  typeText: async (page, req) => {
    const started = Date.now();
    await page.focus(req.selector, { timeout: req.timeoutMs });
    const left = Math.max(1, req.timeoutMs - (Date.now() - started));
    await withTimeout(page.keyboard.type(req.text), left);
  },
  isEditable: (page, req) => page.locator(req.selector).first().evaluate((el) =>
    el.isContentEditable ||
    (['INPUT', 'TEXTAREA', 'SELECT'].includes(el.tagName) && !el.disabled && !el.readOnly),
    null, { timeout: req.timeoutMs }),
  textContent: (page, req) => page.textContent(req.selector, { timeout: req.timeoutMs }),
  computedStyle: (page, req) => page.$eval(req.selector, (el, properties) => {
    const style = getComputedStyle(el);
    const out = {};
    for (const p of properties) out[p] = style.getPropertyValue(p);
    return out;
  }, req.properties),
  animations: (page, req) => page.$eval(req.selector, (el) => el.getAnimations({ subtree: true }).map((a) => {
    const effect = a.effect;
    const timing = effect && effect.getComputedTiming ? effect.getComputedTiming() : {};
    const frames = effect && effect.getKeyframes ? effect.getKeyframes() : [];
    const skip = ['offset', 'computedOffset', 'easing', 'composite'];
    const properties = [...new Set(frames.flatMap((k) => Object.keys(k).filter((p) => !skip.includes(p))))];
    return {
      name: a.animationName || a.transitionProperty || a.id || 'animation',
      durationMs: typeof timing.duration === 'number' ? timing.duration : 0,
      easing: timing.easing || null,
      properties,
      running: a.playState === 'running',
    };
  })),
  beginTrace: (page) => page.evaluate(() => {
    const probe = window.__craftprobe;
    if (!probe) throw new Error('interaction probe not installed');
    probe.mutations = 0;
    probe.keyLatencies = [];
    probe.lastKey = null;
    probe.keyTarget = null;
    probe.layoutShifts = 0;
    probe.tracing = true;
  }),
  endTrace: async (page, req) => {
    await page.waitForTimeout(req.windowMs);
    return page.evaluate(() => {
      const probe = window.__craftprobe;
      if (!probe) throw new Error('interaction probe not installed');
      probe.tracing = false;
      const latencies = probe.keyLatencies;
      return {
        mutations: probe.mutations,
        keystrokeLatencyMs: latencies.length ? latencies.reduce((a, b) => a + b, 0) / latencies.length : null,
        layoutRecalculations: probe.layoutSupported ? probe.layoutShifts : null,
      };
    });
  },
  close: () => null,
};

(async () => {
  const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

  const browser = await playwright.%BROWSER%.launch({ headless: %HEADLESS% });
  browser.on('disconnected', () => process.exit(3));
  const context = await browser.newContext({ viewport: { width: %WIDTH%, height: %HEIGHT% } });
  await context.addInitScript(PROBE);
  const page = await context.newPage();
  page.on('crash', () => process.exit(4));

  send({ ready: true });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    let req;
    try {
      req = JSON.parse(line);
    } catch (e) {
      continue;
    }

    const handler = handlers[req.op];
    try {
      if (!handler) throw new Error('unknown op ' + req.op);
      const value = await handler(page, req);
      send({ id: req.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      send({ id: req.id, ok: false, error: classify(error, req) });
    }

    if (req.op === 'close') break;
  }

  await browser.close();
  process.exit(0);
})().catch((error) => {
  process.stderr.write(String((error && error.stack) || error) + '\n');
  process.exit(1);
});
"#;
