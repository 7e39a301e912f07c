//! Static HTML pages served at `GET /` for each role.
//!
//! The farm dashboard is static markup with fixed DOM slots filled by a
//! small script polling `/api/data`. Relay pages substitute the held value
//! server-side and refresh themselves.

use smartfarm_core::{ReceiveMode, ReceivedValue, RelayMessage};

/// Escape text for safe inclusion in HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Shared stylesheet for every page.
const STYLE: &str = r"
        body { font-family: Arial, sans-serif; margin: 20px; background: #f0f8ff; color: #333; }
        .container { max-width: 800px; margin: 0 auto; }
        .card { background: white; padding: 20px; margin: 10px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        .sensor-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 20px; }
        .sensor-value { font-size: 2em; font-weight: bold; text-align: center; margin: 10px 0; }
        .temp { color: #ff4444; }
        .humidity { color: #4444ff; }
        .soil { color: #2e9e2e; }
        .status { color: #888; }
        .alerts { color: #c0392b; }
        .meta { text-align: center; color: #666; font-size: 0.9em; }
        h1 { text-align: center; }
        input, button { padding: 10px; margin: 5px; }
";

/// The farm dashboard, polling `/api/data` every `refresh_interval_ms`.
pub fn farm_dashboard(refresh_interval_ms: u64) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>SmartFarm Monitor</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <h1>SmartFarm Live Monitor</h1>

        <div class="sensor-grid">
            <div class="card">
                <h3>Temperature</h3>
                <div class="sensor-value temp" id="temperature">--</div>
                <div>&deg;C</div>
            </div>
            <div class="card">
                <h3>Humidity</h3>
                <div class="sensor-value humidity" id="humidity">--</div>
                <div>%</div>
            </div>
            <div class="card">
                <h3>Soil moisture</h3>
                <div class="sensor-value soil" id="soil_moisture">--</div>
                <div>%</div>
            </div>
            <div class="card">
                <h3>Light</h3>
                <div class="sensor-value status" id="light_intensity">--</div>
                <div>lux</div>
            </div>
            <div class="card">
                <h3>Water pump</h3>
                <div class="sensor-value status" id="water_pump">--</div>
            </div>
            <div class="card">
                <h3>Grow lights</h3>
                <div class="sensor-value status" id="led_lights">--</div>
            </div>
            <div class="card">
                <h3>Auto watering</h3>
                <div class="sensor-value status" id="auto_water_enabled">--</div>
                <button onclick="toggleAutoWater()">Toggle</button>
            </div>
        </div>

        <div class="card">
            <h3>Alerts</h3>
            <div class="alerts" id="alerts">--</div>
            <div class="meta">
                Source: <span id="source">--</span> &middot;
                Last updated: <span id="last_updated">--</span>
            </div>
        </div>
    </div>

    <script>
        function fmt(value, digits) {{
            return typeof value === 'number' ? value.toFixed(digits) : '--';
        }}

        function onOff(value) {{
            return value ? 'ON' : 'OFF';
        }}

        let autoWater = true;

        function toggleAutoWater() {{
            fetch('/toggle_auto_water', {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify({{ enabled: !autoWater }})
            }})
                .then(() => updateData())
                .catch(err => console.error('toggle failed', err));
        }}

        function updateData() {{
            fetch('/api/data')
                .then(response => response.json())
                .then(data => {{
                    document.getElementById('temperature').textContent = fmt(data.temperature, 1);
                    document.getElementById('humidity').textContent = fmt(data.humidity, 1);
                    document.getElementById('soil_moisture').textContent = fmt(data.soil_moisture, 1);
                    document.getElementById('light_intensity').textContent = fmt(data.light_intensity, 0);
                    document.getElementById('water_pump').textContent = onOff(data.water_pump);
                    document.getElementById('led_lights').textContent = onOff(data.led_lights);
                    autoWater = data.auto_water_enabled !== false;
                    document.getElementById('auto_water_enabled').textContent = onOff(autoWater);
                    const alerts = Array.isArray(data.alerts) ? data.alerts : [];
                    document.getElementById('alerts').textContent = alerts.length ? alerts.join(', ') : 'none';
                    document.getElementById('source').textContent = data.source || '--';
                    document.getElementById('last_updated').textContent = data.last_updated || '--';
                }})
                .catch(err => console.error('poll failed', err));
        }}

        updateData();
        setInterval(updateData, {refresh_interval_ms});
    </script>
</body>
</html>"#
    )
}

/// The relay source page: current value plus an update form.
pub fn relay_source_page(current: &RelayMessage) -> String {
    let data = escape_html(&current.data);
    let timestamp = current.timestamp;

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Relay Source</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <h1>Relay Source</h1>
        <div class="card">
            <h3>Current value: <span id="data">{data}</span></h3>
            <div class="meta">Last update: {timestamp}</div>
        </div>

        <div class="card">
            <form method="post" action="/update">
                <input type="text" name="new_value" placeholder="New value" required>
                <button type="submit">Update value</button>
            </form>
        </div>

        <div class="card">
            <h3>API</h3>
            <ul>
                <li>GET /api/data -- current value</li>
                <li>POST /update -- replace value (notifies the receiver)</li>
            </ul>
        </div>
    </div>
</body>
</html>"#
    )
}

/// Receiver page showing the held value; reloads itself periodically.
pub fn relay_receiver_page(value: &ReceivedValue, mode: ReceiveMode) -> String {
    let data = escape_html(&value.data);
    let timestamp = value.timestamp;
    let received = value
        .received_at()
        .map_or_else(|| String::from("never"), |at| at.format("%Y-%m-%d %H:%M:%S").to_string());
    let (title, reload_ms, note) = match mode {
        ReceiveMode::Push => (
            "Relay Receiver (webhook)",
            5000,
            "Values arrive through POST /webhook as soon as the source changes.",
        ),
        ReceiveMode::Poll => (
            "Relay Receiver (polling)",
            4000,
            "Values are fetched from the source on a fixed interval. Start with GET /start-polling.",
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>{STYLE}</style>
    <script>
        setTimeout(function() {{ location.reload(); }}, {reload_ms});
    </script>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
        <div class="card">
            <h2>Latest value</h2>
            <h3 id="data">{data}</h3>
            <div class="meta">
                Received: {received}<br>
                Source timestamp: {timestamp}
            </div>
        </div>
        <div class="card">
            <p>{note}</p>
            <p>GET /api/current returns the held value as JSON.</p>
        </div>
    </div>
</body>
</html>"#
    )
}
